use serde_json::{Number, Value};

use super::Schema;
use super::evolve::Evolution;

/// Default span of generated numbers without `maximum`.
const DEFAULT_SPAN: f64 = 99_999.0;

/// Integer formats producing whole numbers.
const SIZED_INTEGER_FORMATS: [&str; 3] = ["int16", "int32", "int64"];

impl Evolution<'_> {
    /// Generates an integer schema value.
    ///
    /// Only the sized formats (`int16`, `int32`, `int64`) produce whole numbers,
    /// a plain `integer` yields a number with two decimals.
    pub(super) fn evolve_integer(&mut self, schema: &Schema) -> Value {
        let sized = schema
            .format
            .as_deref()
            .is_some_and(|format| SIZED_INTEGER_FORMATS.contains(&format));

        if sized {
            self.whole_number(schema)
        } else {
            self.decimal_number(schema)
        }
    }

    pub(super) fn evolve_number(&mut self, schema: &Schema) -> Value {
        self.whole_number(schema)
    }

    fn whole_number(&mut self, schema: &Schema) -> Value {
        let (min, max) = bounds(schema);
        let (low, high) = (min.ceil(), max.floor());
        if low > high {
            // no integer fits, e.g. [0.2, 0.8]
            return float_value(self.random.uniform_float(min, max));
        }

        #[allow(clippy::cast_possible_truncation)]
        let value = self.random.uniform_int(low as i64, high as i64);
        Value::from(value)
    }

    fn decimal_number(&mut self, schema: &Schema) -> Value {
        let (min, max) = bounds(schema);
        let value = self.random.uniform_float(min, max);
        let rounded = (value * 100.0).round() / 100.0;
        let value = if rounded.is_finite() { rounded } else { value };
        float_value(value.clamp(min, max))
    }
}

fn bounds(schema: &Schema) -> (f64, f64) {
    let min = schema.minimum.unwrap_or(0.0);
    let max = schema.maximum.unwrap_or(min.max(0.0) + DEFAULT_SPAN);
    if min <= max { (min, max) } else { (max, min) }
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}
