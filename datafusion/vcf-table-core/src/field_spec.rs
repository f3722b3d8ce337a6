//! Reserved INFO/FORMAT field specifications from the VCF 4.3 specification.
//!
//! The VCF specification reserves a set of well-known INFO and FORMAT field
//! identifiers and fixes their cardinality (`Number=`) and value type
//! (`Type=`). Real-world headers frequently mis-declare these fields, so
//! schema derivation checks every header definition against this table and
//! corrects the cardinality where the specification is authoritative.

/// Cardinality of a VCF INFO or FORMAT field (the `Number=` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// A fixed number of values per record (`Number=<n>`; 0 for flags).
    Fixed(usize),
    /// One value per alternate allele (`Number=A`).
    PerAltAllele,
    /// One value per allele, reference included (`Number=R`).
    PerAllele,
    /// One value per possible genotype (`Number=G`).
    PerGenotype,
    /// Unknown or variable count (`Number=.`).
    Variable,
}

impl Cardinality {
    /// Returns the VCF string representation of this cardinality.
    pub fn as_vcf_str(&self) -> String {
        match self {
            Cardinality::Fixed(n) => n.to_string(),
            Cardinality::PerAltAllele => "A".to_string(),
            Cardinality::PerAllele => "R".to_string(),
            Cardinality::PerGenotype => "G".to_string(),
            Cardinality::Variable => ".".to_string(),
        }
    }
}

/// Value type of a VCF INFO or FORMAT field (the `Type=` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// 32-bit signed integer values.
    Integer,
    /// 32-bit floating point values.
    Float,
    /// Presence/absence flag (INFO only, always `Number=0`).
    Flag,
    /// Single character values.
    Character,
    /// String values.
    String,
}

impl ValueKind {
    /// Returns the VCF string representation of this type.
    pub fn as_vcf_str(&self) -> &'static str {
        match self {
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Flag => "Flag",
            ValueKind::Character => "Character",
            ValueKind::String => "String",
        }
    }
}

/// Specification entry for a reserved field: cardinality and value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Cardinality fixed by the VCF specification.
    pub cardinality: Cardinality,
    /// Value type fixed by the VCF specification.
    pub kind: ValueKind,
}

const fn spec(cardinality: Cardinality, kind: ValueKind) -> FieldSpec {
    FieldSpec { cardinality, kind }
}

/// Looks up the reserved specification for an INFO field identifier.
///
/// Returns `None` for identifiers the VCF specification does not reserve;
/// such fields are taken verbatim from the header.
pub fn reserved_info(id: &str) -> Option<FieldSpec> {
    use Cardinality::*;
    use ValueKind::*;
    let s = match id {
        "AA" => spec(Fixed(1), String),
        "AC" => spec(PerAltAllele, Integer),
        "AD" | "ADF" | "ADR" => spec(PerAllele, Integer),
        "AF" => spec(PerAltAllele, Float),
        "AN" | "DP" | "END" | "MQ0" | "NS" => spec(Fixed(1), Integer),
        "BQ" | "MQ" => spec(Fixed(1), Float),
        "CIGAR" => spec(PerAltAllele, String),
        "SB" => spec(Fixed(4), Integer),
        "DB" | "H2" | "H3" | "SOMATIC" | "VALIDATED" | "1000G" => spec(Fixed(0), Flag),
        _ => return None,
    };
    Some(s)
}

/// Looks up the reserved specification for a FORMAT field identifier.
pub fn reserved_format(id: &str) -> Option<FieldSpec> {
    use Cardinality::*;
    use ValueKind::*;
    let s = match id {
        "AD" | "ADF" | "ADR" => spec(PerAllele, Integer),
        "EC" => spec(PerAltAllele, Integer),
        "GL" | "GP" => spec(PerGenotype, Float),
        "PL" | "PP" => spec(PerGenotype, Integer),
        "DP" | "GQ" | "MQ" | "PQ" | "PS" | "LEN" => spec(Fixed(1), Integer),
        "FT" | "GT" => spec(Fixed(1), String),
        "HQ" => spec(Fixed(2), Integer),
        _ => return None,
    };
    Some(s)
}

/// Outcome of checking a header-declared cardinality against the reserved
/// specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityCheck {
    /// The header declaration matches the specification.
    Conforms,
    /// The header declares `Number=.` where the specification requires an
    /// allele-dependent cardinality; tolerated without correction.
    Tolerated,
    /// The header declaration contradicts the specification; the schema uses
    /// the corrected cardinality.
    Corrected(Cardinality),
}

/// Checks a header-declared cardinality against the reserved specification.
///
/// Allele-dependent specifications (`A`, `R`, `G`) tolerate a generic
/// `Number=.` declaration, since older tools emit it for any multi-valued
/// field. Every other mismatch is corrected to the specification value.
pub fn check_cardinality(declared: Cardinality, spec: Cardinality) -> CardinalityCheck {
    if declared == spec {
        return CardinalityCheck::Conforms;
    }
    match spec {
        Cardinality::PerAltAllele | Cardinality::PerAllele | Cardinality::PerGenotype
            if declared == Cardinality::Variable =>
        {
            CardinalityCheck::Tolerated
        }
        _ => CardinalityCheck::Corrected(spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_info_allele_dependent_fields() {
        assert_eq!(
            reserved_info("AC"),
            Some(spec(Cardinality::PerAltAllele, ValueKind::Integer))
        );
        assert_eq!(
            reserved_info("AF"),
            Some(spec(Cardinality::PerAltAllele, ValueKind::Float))
        );
        assert_eq!(
            reserved_info("AD"),
            Some(spec(Cardinality::PerAllele, ValueKind::Integer))
        );
    }

    #[test]
    fn reserved_info_flags() {
        for id in ["DB", "H2", "H3", "SOMATIC", "VALIDATED", "1000G"] {
            assert_eq!(
                reserved_info(id),
                Some(spec(Cardinality::Fixed(0), ValueKind::Flag)),
                "INFO/{id}"
            );
        }
    }

    #[test]
    fn reserved_info_strand_bias_is_fixed_four() {
        assert_eq!(
            reserved_info("SB"),
            Some(spec(Cardinality::Fixed(4), ValueKind::Integer))
        );
    }

    #[test]
    fn reserved_format_genotype_fields() {
        assert_eq!(
            reserved_format("GT"),
            Some(spec(Cardinality::Fixed(1), ValueKind::String))
        );
        assert_eq!(
            reserved_format("PL"),
            Some(spec(Cardinality::PerGenotype, ValueKind::Integer))
        );
        assert_eq!(
            reserved_format("GL"),
            Some(spec(Cardinality::PerGenotype, ValueKind::Float))
        );
        assert_eq!(
            reserved_format("HQ"),
            Some(spec(Cardinality::Fixed(2), ValueKind::Integer))
        );
    }

    #[test]
    fn unreserved_fields_are_unknown() {
        assert_eq!(reserved_info("SVTYPE"), None);
        assert_eq!(reserved_format("WHATEVER"), None);
    }

    #[test]
    fn matching_declaration_conforms() {
        assert_eq!(
            check_cardinality(Cardinality::PerAltAllele, Cardinality::PerAltAllele),
            CardinalityCheck::Conforms
        );
        assert_eq!(
            check_cardinality(Cardinality::Fixed(1), Cardinality::Fixed(1)),
            CardinalityCheck::Conforms
        );
    }

    #[test]
    fn variable_declaration_tolerated_for_allele_dependent_specs() {
        for spec_card in [
            Cardinality::PerAltAllele,
            Cardinality::PerAllele,
            Cardinality::PerGenotype,
        ] {
            assert_eq!(
                check_cardinality(Cardinality::Variable, spec_card),
                CardinalityCheck::Tolerated
            );
        }
    }

    #[test]
    fn variable_declaration_corrected_for_fixed_specs() {
        assert_eq!(
            check_cardinality(Cardinality::Variable, Cardinality::Fixed(1)),
            CardinalityCheck::Corrected(Cardinality::Fixed(1))
        );
    }

    #[test]
    fn wrong_declaration_corrected() {
        // AC declared as Number=1 must become Number=A.
        assert_eq!(
            check_cardinality(Cardinality::Fixed(1), Cardinality::PerAltAllele),
            CardinalityCheck::Corrected(Cardinality::PerAltAllele)
        );
        // PL declared as Number=R must become Number=G.
        assert_eq!(
            check_cardinality(Cardinality::PerAllele, Cardinality::PerGenotype),
            CardinalityCheck::Corrected(Cardinality::PerGenotype)
        );
    }

    #[test]
    fn vcf_string_round_trip() {
        assert_eq!(Cardinality::PerAltAllele.as_vcf_str(), "A");
        assert_eq!(Cardinality::Fixed(0).as_vcf_str(), "0");
        assert_eq!(Cardinality::Variable.as_vcf_str(), ".");
        assert_eq!(ValueKind::Flag.as_vcf_str(), "Flag");
    }
}
