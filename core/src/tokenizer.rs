//! Text normalization feeding the index: NFKC, lowercase, word segmentation,
//! stopword removal and optional English stemming.
//!
//! The index itself never tokenizes; any producer of token sequences works.

use crate::model::Operator;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}[\p{N}_.]*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProcessorConfig {
    pub stem: bool,
    pub remove_stopwords: bool,
    /// Tokens shorter than this many characters are dropped.
    pub min_token_chars: usize,
}

impl Default for TextProcessorConfig {
    fn default() -> Self { Self { stem: true, remove_stopwords: true, min_token_chars: 2 } }
}

#[derive(Debug, Clone, Default)]
pub struct TextProcessor {
    config: TextProcessorConfig,
}

impl TextProcessor {
    pub fn new(config: TextProcessorConfig) -> Self { Self { config } }

    pub fn config(&self) -> &TextProcessorConfig { &self.config }

    /// Normalize `text` into index terms, in document order.
    pub fn process(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().replace('\u{fffd}', " ").to_lowercase();
        RE.find_iter(&normalized).filter_map(|m| self.term(m.as_str())).collect()
    }

    /// Like [`process`](Self::process), but upper-case `AND`, `OR` and `NOT` survive verbatim
    /// as Boolean operator tokens.
    pub fn process_query(&self, query: &str) -> Vec<String> {
        let mut out = Vec::new();
        for word in query.split_whitespace() {
            if Operator::from_token(word).is_some() {
                out.push(word.to_string());
            } else {
                out.extend(self.process(word));
            }
        }
        out
    }

    fn term(&self, token: &str) -> Option<String> {
        if token.chars().count() < self.config.min_token_chars {
            return None;
        }
        if self.config.remove_stopwords && STOPWORDS.contains(token) {
            return None;
        }
        if self.config.stem {
            Some(STEMMER.stem(token).into_owned())
        } else {
            Some(token.to_string())
        }
    }
}
