//! Lexical relevance ranking of past turns
//!
//! Query and candidates are reduced to sets of terms (lowercased, punctuation
//! and accents stripped, stopwords removed, a few synonyms folded onto one
//! concept). A candidate scores the share of its own terms that also appear
//! in the query, so long turns are not favored just for being long.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::db::Turn;

/// Words that carry no topic on their own
const STOPWORDS: &[&str] = &[
    "a", "al", "algo", "como", "con", "de", "del", "el", "ella", "en", "era", "es", "esa", "ese",
    "eso", "esta", "estoy", "este", "esto", "fue", "ha", "hay", "la", "las", "le", "lo", "los",
    "me", "mi", "mis", "muy", "no", "nos", "o", "para", "pero", "por", "que", "se", "si", "sin",
    "soy", "su", "sus", "te", "ti", "tu", "tus", "un", "una", "uno", "y", "ya", "yo", "an", "and",
    "are", "be", "do", "for", "i", "is", "it", "m", "my", "of", "on", "or", "s", "so", "the",
    "to", "was", "what", "you", "your",
];

/// Synonym groups; every member folds onto the first entry
const CONCEPTS: &[&[&str]] = &[
    &[
        "trabajo", "profesion", "trabajar", "trabajas", "trabaja", "empleo", "oficio", "ocupacion",
        "carrera", "work", "job", "profession", "occupation", "career",
    ],
    &[
        "medicina", "medico", "medica", "medicos", "doctor", "doctora", "doctores", "physician",
        "medicine", "medical",
    ],
    &["nombre", "llamo", "llamas", "llama", "name", "called"],
    &["edad", "anos", "cumpleanos", "age", "old", "birthday"],
    &["vivir", "vivo", "vives", "vive", "ciudad", "pais", "live", "city", "country", "hometown"],
    &[
        "estudiar", "estudio", "estudias", "estudiante", "universidad", "study", "student",
        "university",
    ],
];

/// Strip diacritics from common Latin vowels
pub(crate) fn fold_accents(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn canonical(word: String) -> String {
    CONCEPTS
        .iter()
        .find(|group| group.contains(&word.as_str()))
        .map_or(word, |group| group[0].to_string())
}

/// Reduce text to its set of comparable terms
#[must_use]
pub fn terms(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(fold_accents)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .map(canonical)
        .collect()
}

/// Score of one candidate, kept as a fraction so ordering is exact
#[derive(Debug, Clone, Copy)]
struct Score {
    shared: usize,
    total: usize,
}

impl Score {
    fn cmp_value(self, other: Self) -> Ordering {
        // shared/total compared without floating point
        (self.shared * other.total).cmp(&(other.shared * self.total))
    }
}

/// Rank `candidates` by relevance to `query`, best first
///
/// Returns at most `limit` turns. Candidates sharing no term with the query
/// are dropped rather than used as padding. Equal scores go to the newer turn.
#[must_use]
pub fn rank<'a>(query: &str, candidates: &'a [Turn], limit: usize) -> Vec<&'a Turn> {
    let query_terms = terms(query);
    if query_terms.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(&Turn, Score)> = candidates
        .iter()
        .filter_map(|turn| {
            let turn_terms = terms(&turn.text);
            let shared = turn_terms.intersection(&query_terms).count();
            (shared > 0).then_some((
                turn,
                Score {
                    shared,
                    total: turn_terms.len(),
                },
            ))
        })
        .collect();

    scored.sort_by(|(a, a_score), (b, b_score)| {
        b_score.cmp_value(*a_score).then_with(|| b.id.cmp(&a.id))
    });
    scored.truncate(limit);

    scored.into_iter().map(|(turn, _)| turn).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::Role;

    fn turn(id: i64, text: &str) -> Turn {
        Turn {
            id,
            role: Role::User,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_terms_normalization() {
        let t = terms("¡Hola! ¿Cuál es TU profesión, médica?");
        assert!(t.contains("hola"));
        assert!(t.contains("cual"));
        assert!(t.contains("trabajo"));
        assert!(t.contains("medicina"));
        assert!(!t.contains("tu"));
    }

    #[test]
    fn test_tilde_n_folds_onto_age_concept() {
        assert_eq!(fold_accents("cumpleaños"), "cumpleanos");
        assert!(terms("¿Cuántos años tienes?").contains("edad"));

        let candidates = vec![turn(1, "tengo treinta años"), turn(2, "me gusta el café")];
        let ranked = rank("¿qué edad tengo?", &candidates, 5);
        assert_eq!(ranked.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_related_turn_ranks_above_unrelated() {
        let candidates = vec![turn(1, "trabajo como doctora"), turn(2, "hola buenos días")];

        let ranked = rank("profesión médica", &candidates, 5);
        assert_eq!(ranked.first().map(|t| t.id), Some(1));
        assert!(ranked.iter().all(|t| t.id != 2));
    }

    #[test]
    fn test_ties_prefer_newer() {
        let candidates = vec![
            turn(3, "me gusta el café"),
            turn(7, "me gusta el café"),
            turn(5, "me gusta el café"),
        ];

        let ranked = rank("café", &candidates, 3);
        assert_eq!(ranked.iter().map(|t| t.id).collect::<Vec<_>>(), vec![7, 5, 3]);
    }

    #[test]
    fn test_short_focused_turn_beats_long_one() {
        let candidates = vec![
            turn(1, "ayer fuimos al parque y luego comimos paella con toda la familia en la playa"),
            turn(2, "la paella estaba rica"),
        ];

        let ranked = rank("paella", &candidates, 2);
        assert_eq!(ranked[0].id, 2);
        assert_eq!(ranked[1].id, 1);
    }

    #[test]
    fn test_no_overlap_returns_empty() {
        let candidates = vec![turn(1, "hola buenos días"), turn(2, "qué tal")];
        assert!(rank("astronomía", &candidates, 3).is_empty());
        assert!(rank("", &candidates, 3).is_empty());
        assert!(rank("...", &candidates, 3).is_empty());
    }

    #[test]
    fn test_respects_limit() {
        let candidates: Vec<Turn> = (1..=10).map(|i| turn(i, "hablemos de música")).collect();

        let ranked = rank("música", &candidates, 3);
        assert_eq!(ranked.len(), 3);
        assert!(rank("música", &candidates, 0).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let candidates = vec![
            turn(1, "vivo en Madrid"),
            turn(2, "mi ciudad favorita es Roma"),
            turn(3, "Madrid tiene buen clima"),
        ];

        let first = rank("¿en qué ciudad vives, Madrid?", &candidates, 3);
        let second = rank("¿en qué ciudad vives, Madrid?", &candidates, 3);
        assert_eq!(
            first.iter().map(|t| t.id).collect::<Vec<_>>(),
            second.iter().map(|t| t.id).collect::<Vec<_>>()
        );
    }
}
