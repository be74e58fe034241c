/// Column and unit registries for the supported instrument log formats.
///
/// Maps raw instrument column labels onto canonical field names and raw unit
/// suffixes onto scale factors relative to each field's canonical unit. This
/// is the single source of truth for label spellings: the normalizer never
/// hardcodes a column name.
///
/// The two column registries overlap but are kept separate on purpose. Some
/// labels only exist in one export (`Barometric Pressure`, `Water Density`)
/// and the two formats match labels with different rules.

use crate::model::PurgeError;

// ---------------------------------------------------------------------------
// Column mappings
// ---------------------------------------------------------------------------

/// One raw label (or label prefix) and the canonical field it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub label: &'static str,
    pub field: &'static str,
}

const fn map(label: &'static str, field: &'static str) -> ColumnMapping {
    ColumnMapping { label, field }
}

/// How a raw label is compared against registry labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// The raw label starts with the registry label; the rest is the unit.
    Prefix,
    /// The raw label equals the registry label, either as-is or after
    /// removing a trailing parenthesized unit (`"Temperature (C)"`).
    ExactOrStripped,
}

/// Column labels of the Aqua TROLL CSV export, matched by prefix.
/// `"Temp (C)"` matches `"Temp"` and leaves `"(C)"` as the unit.
pub static CSV_EXPORT_COLUMNS: &[ColumnMapping] = &[
    map("Date/Time", "datetime"),
    map("Temp", "temp"),
    map("Pres", "pres"),
    map("Depth", "depth"),
    map("CNDCT", "cndct"),
    map("SPCNDCT", "spcndct"),
    map("SA", "sa"),
    map("TDS", "tds"),
    map("pH", "ph"),
    map("ORP", "orp"),
    map("DO(con)", "do_con"),
    map("DO(%sat)", "do_sat"),
    map("Turbidity", "turbidity"),
    map("PPO2", "ppo2"),
    map("Batt Perc(%)", "batt"),
    map("R", "resis"),
];

/// Column labels of In-Situ log records, matched exactly or with the unit
/// stripped. Covers both the CSV-style short labels and the long labels of
/// the text dump.
pub static INSITU_RECORD_COLUMNS: &[ColumnMapping] = &[
    // csv log column names
    map("Date/Time", "datetime"),
    map("Temp", "temp"),
    map("Pres", "pres"),
    map("Depth", "depth"),
    map("CNDCT", "cndct"),
    map("SPCNDCT", "spcndct"),
    map("SA", "sa"),
    map("TDS", "tds"),
    map("pH", "ph"),
    map("ORP", "orp"),
    map("DO(con)", "do_con"),
    map("DO(%sat)", "do_sat"),
    map("Turbidity", "turbidity"),
    map("PPO2", "ppo2"),
    map("Batt Perc(%)", "batt"),
    map("R", "resis"),
    // txt dump column names
    map("Date and Time", "datetime"),
    map("Temperature", "temp"),
    map("External Voltage", "v"),
    map("Battery Percentage (%)", "batt"),
    map("Barometric Pressure", "pres_baro"),
    map("Pressure", "pres"),
    map("Dissolved Oxygen (concentration)", "do_con"),
    map("Partial Pressure Oxygen", "ppo2"),
    map("pH(mV)", "ph_mv"),
    map("Dissolved Oxygen (%saturation)", "do_sat"),
    map("Oxidation Reduction Potential (ORP)", "orp"),
    map("Actual Conductivity", "cndct"),
    map("Specific Conductivity", "spcndct"),
    map("Salinity", "sa"),
    map("Resistivity", "resis"),
    map("Water Density", "wtr_d"),
    map("Total Dissolved Solids", "tds"),
];

/// Resolves `label` against `registry` under `rule`.
///
/// Returns the matched entry and the trimmed unit suffix (empty when the
/// label carries no unit), or `None` if nothing matches.
///
/// Under [`MatchRule::Prefix`] the first entry in registry order wins. Under
/// [`MatchRule::ExactOrStripped`] an exact match anywhere in the registry
/// beats a unit-stripped match, so `"pH(mV)"` resolves to `ph_mv` rather
/// than to `ph` with a `(mV)` unit.
pub fn match_column<'a>(
    registry: &'static [ColumnMapping],
    rule: MatchRule,
    label: &'a str,
) -> Option<(&'static ColumnMapping, &'a str)> {
    let entry = match rule {
        MatchRule::Prefix => registry.iter().find(|m| label.starts_with(m.label)),
        MatchRule::ExactOrStripped => registry
            .iter()
            .find(|m| m.label == label)
            .or_else(|| {
                let stripped = strip_unit_suffix(label);
                registry.iter().find(|m| m.label == stripped)
            }),
    }?;

    Some((entry, label[entry.label.len()..].trim()))
}

/// Removes a trailing `(...)` group and at most one whitespace character
/// before it. The group opens at the first `(` with no `)` between it and
/// the final one, so `"a (b(c)"` strips to `"a"`. Labels without a trailing
/// group are returned unchanged.
pub fn strip_unit_suffix(label: &str) -> &str {
    let Some(body) = label.strip_suffix(')') else {
        return label;
    };
    let group_from = body.rfind(')').map_or(0, |close| close + 1);
    let Some(open) = body[group_from..].find('(') else {
        return label;
    };
    let head = &label[..group_from + open];
    match head.chars().next_back() {
        Some(c) if c.is_whitespace() => &head[..head.len() - c.len_utf8()],
        _ => head,
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// A raw unit suffix and the factor that converts it to the canonical unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    pub suffix: &'static str,
    pub factor: f64,
}

const fn unit(suffix: &'static str, factor: f64) -> UnitScale {
    UnitScale { suffix, factor }
}

/// Canonical units: °C, PSI, m, µS/cm, PSU, ppm, pH, mV, mg/L, %sat, NTU,
/// Torr, ohm-cm, V and g/cm3.
pub static UNIT_REGISTRY: &[UnitScale] = &[
    unit("(C)", 1.0),
    unit("(PSI)", 1.0),
    unit("(mmHg)", 1.0 / 51.7149),
    unit("(m)", 1.0),
    unit("(ft)", 0.3048),
    unit("(µS/cm)", 1.0),
    unit("(μS/cm)", 1.0), // Greek mu, emitted by newer firmware
    unit("(uS/cm)", 1.0),
    unit("(mS/cm)", 1000.0),
    unit("(PSU)", 1.0),
    unit("(ppm)", 1.0),
    unit("(ppt)", 1000.0),
    unit("(pH)", 1.0),
    unit("(mV)", 1.0),
    unit("(mg/L)", 1.0),
    unit("(%Sat)", 1.0),
    unit("(NTU)", 1.0),
    unit("(Torr)", 1.0),
    unit("(ohm-cm)", 1.0),
    unit("(V)", 1.0),
    unit("(g/cm3)", 1.0),
];

/// Scale factor for a raw unit suffix.
///
/// An empty suffix means the value is already canonical (factor 1.0). A
/// non-empty suffix with no registry entry rejects the whole log.
pub fn unit_scale(suffix: &str) -> Result<f64, PurgeError> {
    if suffix.is_empty() {
        return Ok(1.0);
    }
    UNIT_REGISTRY
        .iter()
        .find(|u| u.suffix == suffix)
        .map(|u| u.factor)
        .ok_or_else(|| PurgeError::UnknownUnit(suffix.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Canonical field names a registry can produce, in first-seen order.
    fn canonical_fields(registry: &'static [ColumnMapping]) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = Vec::new();
        for entry in registry {
            if !fields.contains(&entry.field) {
                fields.push(entry.field);
            }
        }
        fields
    }

    #[test]
    fn test_no_duplicate_labels_in_either_registry() {
        for registry in [CSV_EXPORT_COLUMNS, INSITU_RECORD_COLUMNS] {
            let mut seen = HashSet::new();
            for entry in registry {
                assert!(
                    seen.insert(entry.label),
                    "duplicate label '{}' in column registry",
                    entry.label
                );
            }
        }
    }

    #[test]
    fn test_no_duplicate_unit_suffixes() {
        let mut seen = HashSet::new();
        for u in UNIT_REGISTRY {
            assert!(seen.insert(u.suffix), "duplicate unit suffix '{}'", u.suffix);
        }
    }

    #[test]
    fn test_all_unit_factors_positive_and_finite() {
        for u in UNIT_REGISTRY {
            assert!(
                u.factor.is_finite() && u.factor > 0.0,
                "unit '{}' has invalid factor {}",
                u.suffix,
                u.factor
            );
        }
    }

    #[test]
    fn test_registries_disagree_on_dump_only_fields() {
        let csv = canonical_fields(CSV_EXPORT_COLUMNS);
        let insitu = canonical_fields(INSITU_RECORD_COLUMNS);
        for field in ["pres_baro", "wtr_d", "ph_mv", "v"] {
            assert!(!csv.contains(&field), "'{}' should not be in the CSV registry", field);
            assert!(insitu.contains(&field), "'{}' missing from record registry", field);
        }
    }

    #[test]
    fn test_both_registries_map_datetime() {
        assert!(canonical_fields(CSV_EXPORT_COLUMNS).contains(&"datetime"));
        assert!(canonical_fields(INSITU_RECORD_COLUMNS).contains(&"datetime"));
    }

    #[test]
    fn test_prefix_rule_splits_unit() {
        let (entry, unit) =
            match_column(CSV_EXPORT_COLUMNS, MatchRule::Prefix, "Temp (C)").unwrap();
        assert_eq!(entry.field, "temp");
        assert_eq!(unit, "(C)");
    }

    #[test]
    fn test_prefix_rule_without_unit() {
        let (entry, unit) =
            match_column(CSV_EXPORT_COLUMNS, MatchRule::Prefix, "Date/Time").unwrap();
        assert_eq!(entry.field, "datetime");
        assert_eq!(unit, "");
    }

    #[test]
    fn test_prefix_rule_uses_registry_order() {
        // "SPCNDCT" is listed after "CNDCT" but "CNDCT" is not its prefix
        let (entry, unit) =
            match_column(CSV_EXPORT_COLUMNS, MatchRule::Prefix, "SPCNDCT (µS/cm)").unwrap();
        assert_eq!(entry.field, "spcndct");
        assert_eq!(unit, "(µS/cm)");
    }

    #[test]
    fn test_prefix_rule_unknown_label() {
        assert!(match_column(CSV_EXPORT_COLUMNS, MatchRule::Prefix, "Chlorophyll").is_none());
    }

    #[test]
    fn test_stripped_rule_matches_long_labels() {
        let (entry, unit) = match_column(
            INSITU_RECORD_COLUMNS,
            MatchRule::ExactOrStripped,
            "Barometric Pressure (mmHg)",
        )
        .unwrap();
        assert_eq!(entry.field, "pres_baro");
        assert_eq!(unit, "(mmHg)");
    }

    #[test]
    fn test_stripped_rule_prefers_exact_match() {
        let (entry, unit) =
            match_column(INSITU_RECORD_COLUMNS, MatchRule::ExactOrStripped, "pH(mV)").unwrap();
        assert_eq!(entry.field, "ph_mv");
        assert_eq!(unit, "");
    }

    #[test]
    fn test_stripped_rule_keeps_parenthesized_label() {
        let (entry, unit) = match_column(
            INSITU_RECORD_COLUMNS,
            MatchRule::ExactOrStripped,
            "Dissolved Oxygen (concentration) (mg/L)",
        )
        .unwrap();
        assert_eq!(entry.field, "do_con");
        assert_eq!(unit, "(mg/L)");
    }

    #[test]
    fn test_stripped_rule_rejects_prefix_only_match() {
        // "Temperature Offset" starts with "Temp" but is not "Temp" + unit
        assert!(
            match_column(
                INSITU_RECORD_COLUMNS,
                MatchRule::ExactOrStripped,
                "Temperature Offset (C)"
            )
            .is_none()
        );
    }

    #[test]
    fn test_strip_unit_suffix() {
        assert_eq!(strip_unit_suffix("Temperature (C)"), "Temperature");
        assert_eq!(strip_unit_suffix("DO(con)"), "DO");
        assert_eq!(strip_unit_suffix("Salinity"), "Salinity");
        assert_eq!(strip_unit_suffix("Temp  (C)"), "Temp ");
    }

    #[test]
    fn test_strip_unit_suffix_any_whitespace_and_leftmost_group() {
        assert_eq!(strip_unit_suffix("Temperature\t(C)"), "Temperature");
        assert_eq!(strip_unit_suffix("a (b(c)"), "a");
        assert_eq!(strip_unit_suffix("a (b) (c)"), "a (b)");
        assert_eq!(strip_unit_suffix("a (b))"), "a (b))");
        assert_eq!(strip_unit_suffix("()"), "");
    }

    #[test]
    fn test_tab_separated_unit_still_matches() {
        let (entry, unit) =
            match_column(INSITU_RECORD_COLUMNS, MatchRule::ExactOrStripped, "Temperature\t(C)")
                .unwrap();
        assert_eq!(entry.field, "temp");
        assert_eq!(unit, "(C)");
    }

    #[test]
    fn test_unit_scale_lookup() {
        assert_eq!(unit_scale("").unwrap(), 1.0);
        assert_eq!(unit_scale("(mS/cm)").unwrap(), 1000.0);
        assert_eq!(unit_scale("(ft)").unwrap(), 0.3048);
        assert_eq!(
            unit_scale("(kPa)"),
            Err(PurgeError::UnknownUnit("(kPa)".to_string()))
        );
    }

    #[test]
    fn test_unit_round_trip_for_every_entry() {
        for u in UNIT_REGISTRY {
            let raw = 123.456;
            let factor = unit_scale(u.suffix).unwrap();
            let back = raw * factor * (1.0 / factor);
            assert!(
                (back - raw).abs() < 1e-9,
                "round trip through '{}' drifted: {} -> {}",
                u.suffix,
                raw,
                back
            );
        }
    }
}
