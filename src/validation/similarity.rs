/// Fuzzy string similarity in `0.0..=1.0` used by cross-field matching.
pub struct Similarity;

const WINKLER_PREFIX: usize = 4;
const WINKLER_SCALE: f64 = 0.1;

impl Similarity {
    /// Token-sort similarity: both sides are uppercased, split on whitespace
    /// and MRZ filler, sorted and re-joined before comparison, so word order
    /// does not matter.
    pub fn token_sort(a: &str, b: &str) -> f64 {
        Self::jaro_winkler(&Self::sorted_tokens(a), &Self::sorted_tokens(b))
    }

    pub fn sorted_tokens(value: &str) -> String {
        let upper = value.to_uppercase();
        let mut tokens: Vec<&str> = upper
            .split(|c: char| c.is_whitespace() || c == '<')
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }

    pub fn jaro_winkler(a: &str, b: &str) -> f64 {
        let jaro = Self::jaro(a, b);
        let prefix = a
            .chars()
            .zip(b.chars())
            .take(WINKLER_PREFIX)
            .take_while(|(x, y)| x == y)
            .count();
        jaro + prefix as f64 * WINKLER_SCALE * (1.0 - jaro)
    }

    pub fn jaro(a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let window = (a.len().max(b.len()) / 2).saturating_sub(1);
        let mut a_matched = vec![false; a.len()];
        let mut b_matched = vec![false; b.len()];
        let mut matches = 0usize;

        for (i, ca) in a.iter().enumerate() {
            let start = i.saturating_sub(window);
            let end = (i + window + 1).min(b.len());
            for j in start..end {
                if !b_matched[j] && b[j] == *ca {
                    a_matched[i] = true;
                    b_matched[j] = true;
                    matches += 1;
                    break;
                }
            }
        }
        if matches == 0 {
            return 0.0;
        }

        let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
        let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
        let transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count() / 2;

        let m = matches as f64;
        (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64) / m) / 3.0
    }
}
