//! Sentiment scoring.
//!
//! [`LexiconScorer`] averages word-level scores from a small built-in lexicon.
//! An intensifier scales the next scored word; a negation within the previous
//! three words flips and halves its polarity.

use std::collections::HashMap;
use std::sync::LazyLock;

use firehose_common::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    /// In [-1, 1].
    pub polarity: f64,
    /// In [0, 1].
    pub subjectivity: f64,
}

impl Sentiment {
    pub const NEUTRAL: Sentiment = Sentiment {
        polarity: 0.0,
        subjectivity: 0.0,
    };
}

/// Maps cleaned text to a sentiment pair. Implementations must be pure.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<Sentiment>;
}

// (word, polarity, subjectivity)
const LEXICON: &[(&str, f64, f64)] = &[
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("bad", -0.7, 0.67),
    ("beautiful", 0.85, 1.0),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("boring", -1.0, 1.0),
    ("broken", -0.4, 0.4),
    ("crazy", -0.6, 0.9),
    ("cute", 0.5, 1.0),
    ("dead", -0.2, 0.4),
    ("disappointing", -0.6, 0.7),
    ("disgusting", -1.0, 1.0),
    ("easy", 0.43, 0.83),
    ("evil", -1.0, 1.0),
    ("excellent", 1.0, 1.0),
    ("excited", 0.4, 0.75),
    ("fantastic", 0.4, 0.9),
    ("fine", 0.42, 0.5),
    ("free", 0.4, 0.8),
    ("fun", 0.3, 0.2),
    ("funny", 0.25, 1.0),
    ("glad", 0.5, 1.0),
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("happy", 0.8, 1.0),
    ("hate", -0.8, 0.9),
    ("horrible", -1.0, 1.0),
    ("important", 0.4, 1.0),
    ("interesting", 0.5, 0.5),
    ("lovely", 0.5, 0.75),
    ("love", 0.5, 0.6),
    ("lucky", 0.33, 1.0),
    ("nice", 0.6, 1.0),
    ("perfect", 1.0, 1.0),
    ("poor", -0.4, 0.6),
    ("proud", 0.8, 1.0),
    ("sad", -0.5, 1.0),
    ("scary", -0.5, 1.0),
    ("sick", -0.71, 0.86),
    ("stupid", -0.8, 1.0),
    ("terrible", -1.0, 1.0),
    ("ugly", -0.7, 1.0),
    ("unfair", -0.5, 0.9),
    ("wonderful", 1.0, 1.0),
    ("worse", -0.4, 0.6),
    ("worst", -1.0, 1.0),
    ("wrong", -0.5, 0.9),
];

// (word, multiplier)
const INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.5),
    ("extremely", 1.5),
    ("really", 1.3),
    ("so", 1.3),
    ("super", 1.5),
    ("totally", 1.4),
    ("very", 1.3),
];

const NEGATIONS: &[&str] = &["not", "never", "no", "dont", "isnt", "wasnt", "cant", "nothing"];

const NEGATION_REACH: usize = 3;

static WORDS: LazyLock<HashMap<&'static str, (f64, f64)>> =
    LazyLock::new(|| LEXICON.iter().map(|&(w, p, s)| (w, (p, s))).collect());
static BOOSTS: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| INTENSIFIERS.iter().copied().collect());

#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> Result<Sentiment> {
        let mut polarity_sum = 0.0;
        let mut subjectivity_sum = 0.0;
        let mut matched = 0usize;

        let mut boost = 1.0;
        let mut since_negation: Option<usize> = None;

        for token in text.split_whitespace() {
            let word = token.to_lowercase();

            if NEGATIONS.contains(&word.as_str()) {
                since_negation = Some(0);
                continue;
            }
            if let Some(&multiplier) = BOOSTS.get(word.as_str()) {
                boost = multiplier;
                continue;
            }

            if let Some(&(polarity, subjectivity)) = WORDS.get(word.as_str()) {
                let mut p = (polarity * boost).clamp(-1.0, 1.0);
                if since_negation.is_some_and(|n| n < NEGATION_REACH) {
                    p *= -0.5;
                }
                polarity_sum += p;
                subjectivity_sum += (subjectivity * boost).clamp(0.0, 1.0);
                matched += 1;
                since_negation = None;
            }

            boost = 1.0;
            since_negation = since_negation.map(|n| n + 1);
        }

        if matched == 0 {
            return Ok(Sentiment::NEUTRAL);
        }
        let n = matched as f64;
        Ok(Sentiment {
            polarity: (polarity_sum / n).clamp(-1.0, 1.0),
            subjectivity: (subjectivity_sum / n).clamp(0.0, 1.0),
        })
    }
}
