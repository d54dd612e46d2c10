use std::fmt;
use std::io::Read;

use crate::fits::error::FitsReadError;
use crate::fits::utils::FITS_BLOCK_SIZE;

const CARD_SIZE: usize = 80;
const KEYWORD_SIZE: usize = 8;
const COMMENTARY: [&str; 3] = ["COMMENT", "HISTORY", ""];

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: CardValue,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    INT(i64),
    FLOAT(f64),
    STRING(String),
    LOGICAL(bool),
    EMPTY,
}

impl CardValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CardValue::INT(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as a float; integer cards widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CardValue::FLOAT(v) => Some(*v),
            CardValue::INT(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CardValue::STRING(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CardValue::LOGICAL(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardValue::INT(v) => write!(f, "{v}"),
            CardValue::FLOAT(v) => write!(f, "{v}"),
            CardValue::STRING(s) => f.write_str(s),
            CardValue::LOGICAL(b) => f.write_str(if *b { "T" } else { "F" }),
            CardValue::EMPTY => Ok(()),
        }
    }
}

fn value_from_str(s: &str) -> CardValue {
    match s.trim() {
        "" => CardValue::EMPTY,
        "T" => CardValue::LOGICAL(true),
        "F" => CardValue::LOGICAL(false),
        s => {
            if let Ok(n) = s.parse::<i64>() {
                return CardValue::INT(n);
            }
            // Fortran style exponents: 1.0D+03
            if let Ok(x) = s.replace(['D', 'd'], "E").parse::<f64>() {
                return CardValue::FLOAT(x);
            }
            CardValue::STRING(s.to_string())
        }
    }
}

fn comment_from(s: &str) -> Option<String> {
    let s = s.trim();
    let s = s.strip_prefix('/').unwrap_or(s).trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Splits the text after the value indicator into value and comment.
fn split_value(rest: &str) -> (CardValue, Option<String>) {
    let rest = rest.trim_start();
    if let Some(body) = rest.strip_prefix('\'') {
        let mut value = String::new();
        let mut end = body.len();
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                value.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                value.push('\'');
                chars.next();
            } else {
                end = i + 1;
                break;
            }
        }
        let value = CardValue::STRING(value.trim_end().to_string());
        return (value, comment_from(&body[end..]));
    }
    match rest.find('/') {
        Some(idx) => (value_from_str(&rest[..idx]), comment_from(&rest[idx..])),
        None => (value_from_str(rest), None),
    }
}

impl Card {
    pub fn parse(card_str: &str) -> Self {
        let card_str = card_str.trim_end();
        if let Some(rest) = card_str.strip_prefix("HIERARCH ") {
            if let Some((keyword, value)) = rest.split_once('=') {
                let (value, comment) = split_value(value);
                return Card {
                    keyword: keyword.trim().to_string(),
                    value,
                    comment,
                };
            }
        }
        let keyword = card_str
            .get(..KEYWORD_SIZE)
            .unwrap_or(card_str)
            .trim_end()
            .to_string();
        let rest = card_str.get(KEYWORD_SIZE..).unwrap_or("");
        if COMMENTARY.contains(&keyword.as_str()) || !rest.starts_with('=') {
            return Card {
                keyword,
                value: CardValue::EMPTY,
                comment: comment_from(rest),
            };
        }
        let (value, comment) = split_value(&rest[1..]);
        Card {
            keyword,
            value,
            comment,
        }
    }

    /// Folds a `CONTINUE` card into this long-string card.
    pub fn append_continue(&mut self, card_str: &str) {
        let (next, comment) = split_value(card_str.get(KEYWORD_SIZE..).unwrap_or(""));
        let prev = self.value.to_string();
        let prev = prev.strip_suffix('&').unwrap_or(&prev);
        self.value = CardValue::STRING(format!("{}{}", prev, next));
        if comment.is_some() {
            self.comment = comment;
        }
    }

    fn is_long_string(&self) -> bool {
        matches!(&self.value, CardValue::STRING(s) if s.ends_with('&'))
    }
}

impl Default for Card {
    fn default() -> Self {
        Card {
            keyword: String::new(),
            value: CardValue::EMPTY,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Header { cards: Vec::new() }
    }

    pub fn get_card(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword == name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get_card(name).and_then(|c| c.value.as_int())
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get_card(name).and_then(|c| c.value.as_float())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_card(name).and_then(|c| c.value.as_str())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_card(name).and_then(|c| c.value.as_bool())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cards.iter().any(|c| c.keyword == key)
    }

    /// Reads header blocks until the `END` card. The reader is left at the
    /// start of the data unit.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FitsReadError> {
        let mut header = Header::new();
        let mut last_card = Card::default();
        loop {
            let mut block = [0u8; FITS_BLOCK_SIZE];
            reader.read_exact(&mut block)?;
            for chunk in block.chunks(CARD_SIZE) {
                let s = String::from_utf8_lossy(chunk);
                let card_str = s.trim_end();
                if card_str == "END" {
                    if !last_card.keyword.is_empty() {
                        header.cards.push(last_card);
                    }
                    return Ok(header);
                }
                if card_str.starts_with("CONTINUE") {
                    if !last_card.is_long_string() {
                        return Err(FitsReadError::Parse(
                            "CONTINUE without previous long string".into(),
                        ));
                    }
                    last_card.append_continue(card_str);
                    continue;
                }
                if !last_card.keyword.is_empty() {
                    header.cards.push(std::mem::take(&mut last_card));
                }
                if !card_str.is_empty() {
                    last_card = Card::parse(card_str);
                }
            }
        }
    }
}
