//! Meta-variable filters.
//!
//! A filter is `name OP argument` where OP is `=`, `!=`, `~` or `!~`.
//! List operators compare the candidate's exact source text against a
//! comma-separated value set; regex operators run a compiled regex over it.
//! Filters are consulted when their meta-variable first binds.

use crate::error::FilterError;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct Filter {
    pub name: String,
    pred: Pred,
}

#[derive(Debug, Clone)]
enum Pred {
    InList(Vec<String>),
    NotInList(Vec<String>),
    Matches(Regex),
    NotMatches(Regex),
}

fn is_letter(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn split_values(argument: &str) -> Vec<String> {
    argument.split(',').map(|v| v.trim().to_string()).collect()
}

impl Filter {
    pub fn parse(s: &str) -> Result<Filter, FilterError> {
        if s.is_empty() {
            return Err(FilterError::Empty);
        }
        let bytes = s.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() && is_letter(bytes[pos]) {
            pos += 1;
        }
        if pos == 0 {
            return Err(FilterError::MissingName {
                found: s.chars().next().unwrap_or('\0'),
            });
        }
        let name = s[..pos].to_string();
        if pos == bytes.len() {
            return Err(FilterError::MissingOperator);
        }

        let op = match bytes[pos] {
            b'=' => "=",
            b'~' => "~",
            b'!' => {
                if pos + 1 == bytes.len() {
                    return Err(FilterError::LoneBang);
                }
                match bytes[pos + 1] {
                    b'=' => "!=",
                    b'~' => "!~",
                    other => {
                        return Err(FilterError::BadOperator {
                            found: format!("!{}", other as char),
                        })
                    }
                }
            }
            other => {
                return Err(FilterError::BadOperator {
                    found: (other as char).to_string(),
                })
            }
        };
        pos += op.len();
        let argument = &s[pos..];

        let pred = match op {
            "=" => Pred::InList(split_values(argument)),
            "!=" => Pred::NotInList(split_values(argument)),
            "~" => Pred::Matches(Regex::new(argument)?),
            "!~" => Pred::NotMatches(Regex::new(argument)?),
            _ => unreachable!(),
        };
        Ok(Filter { name, pred })
    }

    /// Runs the predicate over the exact source text of a candidate node.
    pub fn accepts(&self, text: &str) -> bool {
        match &self.pred {
            Pred::InList(values) => values.iter().any(|v| v == text),
            Pred::NotInList(values) => !values.iter().any(|v| v == text),
            Pred::Matches(re) => re.is_match(text),
            Pred::NotMatches(re) => !re.is_match(text),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_in_list() {
        let f = Filter::parse("x=$id, $uid,$gid").unwrap();
        assert_eq!(f.name, "x");
        assert!(f.accepts("$id"));
        assert!(f.accepts("$uid"));
        assert!(!f.accepts("$name"));
    }

    #[test]
    fn test_not_in_list() {
        let f = Filter::parse("x!=1,2").unwrap();
        assert!(!f.accepts("1"));
        assert!(f.accepts("3"));
    }

    #[test]
    fn test_regex() {
        let f = Filter::parse("name~^get").unwrap();
        assert!(f.accepts("getUser"));
        assert!(!f.accepts("setUser"));
        let f = Filter::parse("name!~user$").unwrap();
        assert!(f.accepts("getUserId"));
        assert!(!f.accepts("get_user"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(Filter::parse(""), Err(FilterError::Empty)));
        assert!(matches!(
            Filter::parse("=x"),
            Err(FilterError::MissingName { .. })
        ));
        assert!(matches!(
            Filter::parse("name"),
            Err(FilterError::MissingOperator)
        ));
        assert!(matches!(Filter::parse("name!"), Err(FilterError::LoneBang)));
        assert!(matches!(
            Filter::parse("name<1"),
            Err(FilterError::BadOperator { .. })
        ));
        assert!(matches!(
            Filter::parse("name~[unclosed"),
            Err(FilterError::BadRegex(_))
        ));
    }
}
