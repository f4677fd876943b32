use std::fmt;
use chrono::NaiveDate;

/// The three states of a ".dbf" Logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    True,
    False,
    /// Blank, or a character that means neither true nor false.
    Absent,
}

impl From<bool> for Logical {
    fn from(b: bool) -> Logical {
        if b { Logical::True } else { Logical::False }
    }
}

impl Logical {
    pub fn to_bool(&self) -> Option<bool> {
        match *self {
            Logical::True => Some(true),
            Logical::False => Some(false),
            Logical::Absent => None,
        }
    }
}

/// One cell of a ".dbf" row. `None` means the cell is blank.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Character(Option<String>),
    /// A Numeric field with no decimals.
    Integer(Option<i64>),
    /// A Numeric field with decimals, or a Float field.
    Numeric(Option<f64>),
    Date(Option<NaiveDate>),
    Logical(Logical),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        match *self {
            FieldValue::Character(ref v) => v.is_none(),
            FieldValue::Integer(ref v) => v.is_none(),
            FieldValue::Numeric(ref v) => v.is_none(),
            FieldValue::Date(ref v) => v.is_none(),
            FieldValue::Logical(v) => v == Logical::Absent,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldValue::Character(Some(ref s)) => write!(f, "{}", s),
            FieldValue::Integer(Some(i)) => write!(f, "{}", i),
            FieldValue::Numeric(Some(n)) => write!(f, "{}", n),
            FieldValue::Date(Some(ref d)) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Logical(Logical::True) => write!(f, "true"),
            FieldValue::Logical(Logical::False) => write!(f, "false"),
            _ => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!("NULL", format!("{}", FieldValue::Numeric(None)));
        assert_eq!("NULL", format!("{}", FieldValue::Logical(Logical::Absent)));
        assert_eq!("2019-03-04", format!("{}", FieldValue::Date(NaiveDate::from_ymd_opt(2019, 3, 4))));
        assert_eq!("-12", format!("{}", FieldValue::Integer(Some(-12))));
    }

    #[test]
    fn test_is_absent() {
        assert!(FieldValue::Character(None).is_absent());
        assert!(!FieldValue::Logical(Logical::False).is_absent());
    }
}
