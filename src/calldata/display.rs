use crate::calldata::CalldataValue;
use alloy::primitives::hex;
use core::fmt;

fn write_list(f: &mut fmt::Formatter<'_>, items: &[CalldataValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Human-readable rendering of a calldata value.
///
/// Strings are quoted and escaped, byte strings and addresses are rendered as
/// `0x` hex (addresses checksummed), and an array led by a method marker is
/// rendered as a call, e.g. `transfer(0xAbC..., 100)`. The output is meant for
/// display and logging; it is not parsed back.
impl fmt::Display for CalldataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => f.write_str(&hex::encode_prefixed(b)),
            Self::Address(a) => write!(f, "{a}"),
            Self::Method(name) => write!(f, "#{name}"),
            Self::Array(items) => match self.as_call() {
                Some((name, args)) => {
                    write!(f, "{name}(")?;
                    write_list(f, args)?;
                    f.write_str(")")
                }
                None => {
                    f.write_str("[")?;
                    write_list(f, items)?;
                    f.write_str("]")
                }
            },
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn scalars() {
        assert_eq!(CalldataValue::Null.to_string(), "null");
        assert_eq!(CalldataValue::Bool(true).to_string(), "true");
        assert_eq!(CalldataValue::from(-42i32).to_string(), "-42");
        assert_eq!(CalldataValue::from("a\"b").to_string(), r#""a\"b""#);
        assert_eq!(CalldataValue::from(vec![0xdeu8, 0xad]).to_string(), "0xdead");
        assert_eq!(CalldataValue::method("get").to_string(), "#get");
    }

    #[test]
    fn containers() {
        let list = CalldataValue::Array(vec![1u8.into(), "x".into(), CalldataValue::Null]);
        assert_eq!(list.to_string(), r#"[1, "x", null]"#);

        let map: CalldataValue =
            [("b", CalldataValue::from(2u8)), ("a", CalldataValue::Array(vec![]))]
                .into_iter()
                .collect();
        assert_eq!(map.to_string(), r#"{"a": [], "b": 2}"#);
    }

    #[test]
    fn calls() {
        let to = Address::repeat_byte(0xaa);
        let call = CalldataValue::call("transfer", [CalldataValue::from(to), 100u8.into()]);
        let rendered = call.to_string();
        assert_eq!(rendered, format!("transfer({to}, 100)"));
        assert!(rendered.starts_with("transfer(0x"));

        assert_eq!(CalldataValue::call("noop", Vec::<CalldataValue>::new()).to_string(), "noop()");
    }
}
