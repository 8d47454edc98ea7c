//! Built-in recognizer rules (Spanish and English self-statements)

use super::Rule;
use crate::db::ProfileKey;

/// Words that follow "soy" without being a name
const NOT_A_NAME: &[&str] = &[
    "de", "del", "el", "la", "los", "las", "un", "una", "muy", "tu", "su", "tan", "yo", "bastante",
    "bien", "mal", "nuevo", "nueva", "feliz", "alto", "alta", "bajo", "baja", "así", "como",
    "mayor", "menor", "casado", "casada", "soltero", "soltera", "fan", "parte",
];

/// Occupations recognized after "soy" / "I am a"
const PROFESSIONS: &[&str] = &[
    "abogado", "abogada", "arquitecto", "arquitecta", "artista", "bombero", "bombera", "camarero",
    "camarera", "carpintero", "carpintera", "científico", "científica", "cocinero", "cocinera",
    "contador", "contadora", "desarrollador", "desarrolladora", "diseñador", "diseñadora",
    "doctor", "doctora", "electricista", "enfermero", "enfermera", "escritor", "escritora",
    "estudiante", "farmacéutico", "farmacéutica", "fotógrafo", "fotógrafa", "ingeniero",
    "ingeniera", "maestro", "maestra", "mecánico", "mecánica", "médico", "médica", "músico",
    "música", "periodista", "piloto", "policía", "profesor", "profesora", "programador",
    "programadora", "psicólogo", "psicóloga", "vendedor", "vendedora", "veterinario",
    "veterinaria", "accountant", "architect", "artist", "chef", "designer", "developer",
    "engineer", "firefighter", "journalist", "lawyer", "mechanic", "musician", "nurse",
    "physician", "pilot", "programmer", "scientist", "student", "teacher", "writer",
];

fn is_profession(word: &str) -> bool {
    PROFESSIONS.contains(&word)
}

fn is_name_candidate(word: &str) -> bool {
    !NOT_A_NAME.contains(&word) && !is_profession(word)
}

fn is_place_candidate(word: &str) -> bool {
    !NOT_A_NAME.contains(&word)
}

/// Rule table in priority order
///
/// For a given key, later entries override earlier ones, so more explicit
/// phrasings come last.
const RULES: &[(ProfileKey, &str, Option<fn(&str) -> bool>)] = &[
    // name
    (ProfileKey::Name, r"\bsoy\s+(\p{L}+)", Some(is_name_candidate)),
    (ProfileKey::Name, r"\bcall me\s+(\p{L}+)", Some(is_name_candidate)),
    (ProfileKey::Name, r"\bme llamo\s+(\p{L}+)", None),
    (ProfileKey::Name, r"\bmi nombre es\s+(\p{L}+)", None),
    (ProfileKey::Name, r"\bmy name is\s+(\p{L}+)", None),
    // age
    (ProfileKey::Age, r"\btengo\s+(\d{1,3})\s+años\b", None),
    (ProfileKey::Age, r"\bi(?:'m|\s+am)\s+(\d{1,3})\s+years?\s+old\b", None),
    (ProfileKey::Age, r"\bmi edad es\s+(\d{1,3})\b", None),
    (ProfileKey::Age, r"\bmy age is\s+(\d{1,3})\b", None),
    // profession
    (ProfileKey::Profession, r"\bestudio\s+(\p{L}+)", None),
    (ProfileKey::Profession, r"\bsoy\s+(?:una?\s+)?(\p{L}+)", Some(is_profession)),
    (ProfileKey::Profession, r"\bi(?:'m|\s+am)\s+an?\s+(\p{L}+)", Some(is_profession)),
    (ProfileKey::Profession, r"\btrabajo\s+(?:como|de)\s+(?:una?\s+)?(\p{L}+)", None),
    (ProfileKey::Profession, r"\bi work as\s+(?:an?\s+)?(\p{L}+)", None),
    (ProfileKey::Profession, r"\bmi profesión es\s+(\p{L}+)", None),
    // location
    (ProfileKey::Location, r"\bsoy de\s+(\p{L}+)", Some(is_place_candidate)),
    (ProfileKey::Location, r"\bi(?:'m|\s+am) from\s+(\p{L}+)", None),
    (ProfileKey::Location, r"\bvivo en\s+(?:la\s+|el\s+)?(\p{L}+)", Some(is_place_candidate)),
    (ProfileKey::Location, r"\bi live in\s+(\p{L}+)", None),
];

/// Build the built-in rule list
#[must_use]
pub fn default_rules() -> Vec<Rule> {
    RULES
        .iter()
        .map(|&(key, pattern, guard)| {
            let rule = Rule::new(key, pattern).expect("valid regex");
            match guard {
                Some(guard) => rule.with_guard(guard),
                None => rule,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProfileValue;

    fn rule_for(pattern: &str) -> Rule {
        default_rules()
            .into_iter()
            .find(|r| r.pattern.as_str() == pattern)
            .unwrap()
    }

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(default_rules().len(), RULES.len());
    }

    #[test]
    fn test_soy_name_rule_skips_non_names() {
        let rule = rule_for(r"\bsoy\s+(\p{L}+)");

        assert_eq!(rule.recognize("soy marta"), Some(ProfileValue::Text("marta".to_string())));
        assert_eq!(rule.recognize("soy muy curioso"), None);
        assert_eq!(rule.recognize("soy médica"), None);
        // Later occurrence is still found
        assert_eq!(
            rule.recognize("soy de aquí, soy lola"),
            Some(ProfileValue::Text("lola".to_string()))
        );
    }

    #[test]
    fn test_trabajo_rule() {
        let rule = rule_for(r"\btrabajo\s+(?:como|de)\s+(?:una?\s+)?(\p{L}+)");

        assert_eq!(
            rule.recognize("trabajo de camarero los fines de semana"),
            Some(ProfileValue::Text("camarero".to_string()))
        );
        assert_eq!(
            rule.recognize("trabajo como una profesora"),
            Some(ProfileValue::Text("profesora".to_string()))
        );
    }

    #[test]
    fn test_age_rule_requires_years() {
        let rule = rule_for(r"\btengo\s+(\d{1,3})\s+años\b");

        assert_eq!(rule.recognize("tengo 25 años"), Some(ProfileValue::Integer(25)));
        assert_eq!(rule.recognize("tengo 2 perros"), None);
    }
}
