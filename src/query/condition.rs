use super::KeyPolicy;
use super::placeholder;
use super::quote;
use crate::error::Error;
use crate::error::Result;
use crate::value::IntoValue;
use crate::value::Params;
use crate::value::Value;

/// One WHERE or HAVING predicate, not yet bound to parameter keys.
///
/// Keys are assigned when the predicate is added to a [`Select`](super::Select),
/// namespaced by column and purpose:
///
/// | constructor                     | fragment                                         |
/// |---------------------------------|--------------------------------------------------|
/// | `eq("id", 7)`                   | `` `id` = :id ``                                 |
/// | `compare("price", ">", 10)`     | `` `price` > :price ``                           |
/// | `is_in("id", [1, 2])`           | `` `id` IN ( :idIn0, :idIn1 ) ``                 |
/// | `between("age", 18, 65)`        | `` `age` BETWEEN :ageBetween1 AND :ageBetween2 `` |
/// | `` raw("`a` IS NULL") ``        | `` `a` IS NULL ``                                |
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    kind: Kind,
}

#[derive(Clone, Debug, PartialEq)]
enum Kind {
    None,
    Raw(String),
    Compare { column: String, operator: String, value: Value },
    In { column: String, values: Vec<Value> },
    Between { column: String, low: Value, high: Value },
}

impl Condition {
    /// A predicate that adds nothing.
    pub fn none() -> Self {
        Self { kind: Kind::None }
    }

    /// A fragment used verbatim, without parameters.
    pub fn raw(fragment: impl Into<String>) -> Self {
        Self { kind: Kind::Raw(fragment.into()) }
    }

    pub fn eq<V: IntoValue>(column: impl Into<String>, value: V) -> Self {
        Self::binary(column, "=", value)
    }

    pub fn ne<V: IntoValue>(column: impl Into<String>, value: V) -> Self {
        Self::binary(column, "!=", value)
    }

    pub fn gt<V: IntoValue>(column: impl Into<String>, value: V) -> Self {
        Self::binary(column, ">", value)
    }

    pub fn gte<V: IntoValue>(column: impl Into<String>, value: V) -> Self {
        Self::binary(column, ">=", value)
    }

    pub fn lt<V: IntoValue>(column: impl Into<String>, value: V) -> Self {
        Self::binary(column, "<", value)
    }

    pub fn lte<V: IntoValue>(column: impl Into<String>, value: V) -> Self {
        Self::binary(column, "<=", value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::binary(column, "LIKE", pattern.into())
    }

    pub fn is_in<V: IntoValue>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            kind: Kind::In { column: column.into(), values: values.into_iter().map(IntoValue::into_value).collect() },
        }
    }

    pub fn between<V: IntoValue>(column: impl Into<String>, low: V, high: V) -> Self {
        Self { kind: Kind::Between { column: column.into(), low: low.into_value(), high: high.into_value() } }
    }

    /// `column operator value`; `in` and `between` are recognized in any case.
    pub fn compare<V: IntoValue>(column: impl Into<String>, operator: &str, value: V) -> Result<Self> {
        Self::with_operands(column, operator, vec![value.into_value()])
    }

    /// `column operator operands…`.
    ///
    /// `in` takes every operand, `between` exactly two, any other operator
    /// the first one.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when `between` does not get two operands or a
    /// comparison gets none.
    pub fn with_operands(column: impl Into<String>, operator: &str, operands: Vec<Value>) -> Result<Self> {
        let column = column.into();
        let operator = operator.trim();

        if operator.eq_ignore_ascii_case("in") {
            return Ok(Self { kind: Kind::In { column, values: operands } });
        }

        if operator.eq_ignore_ascii_case("between") {
            let [low, high]: [Value; 2] = operands
                .try_into()
                .map_err(|_| Error::Validation("Between operator requires two operands".to_string()))?;
            return Ok(Self { kind: Kind::Between { column, low, high } });
        }

        match operands.into_iter().next() {
            Some(value) => Ok(Self { kind: Kind::Compare { column, operator: operator.to_string(), value } }),
            None => Err(Error::Validation(format!("Operator `{}` on `{}` requires an operand", operator, column))),
        }
    }

    fn binary<V: IntoValue>(column: impl Into<String>, operator: &str, value: V) -> Self {
        Self { kind: Kind::Compare { column: column.into(), operator: operator.to_string(), value: value.into_value() } }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, Kind::None)
    }

    /// Render into a SQL fragment, binding values into `params` under the
    /// keys chosen by `policy`. `None` for [`Condition::none`].
    pub(crate) fn render(self, params: &mut Params, policy: KeyPolicy) -> Option<String> {
        match self.kind {
            Kind::None => None,
            Kind::Raw(fragment) => Some(fragment),
            Kind::Compare { column, operator, value } => {
                let key = policy.bind(params, placeholder(&column), value);
                Some(format!("{} {} {}", quote(&column), operator, key))
            }
            // An empty list matches nothing.
            Kind::In { values, .. } if values.is_empty() => Some("1 = 0".to_string()),
            Kind::In { column, values } => {
                let base = placeholder(&column);
                let keys: Vec<String> = values
                    .into_iter()
                    .enumerate()
                    .map(|(idx, value)| policy.bind(params, format!("{}In{}", base, idx), value))
                    .collect();
                Some(format!("{} IN ( {} )", quote(&column), keys.join(", ")))
            }
            Kind::Between { column, low, high } => {
                let base = placeholder(&column);
                let low = policy.bind(params, format!("{}Between1", base), low);
                let high = policy.bind(params, format!("{}Between2", base), high);
                Some(format!("{} BETWEEN {} AND {}", quote(&column), low, high))
            }
        }
    }
}
