//! # Position Codec
//!
//! Canvas positions are stored in a document's specification string as the
//! integer-valued `x` and `y` keys, leaving every other key untouched.

use charon_extensions::SpecificationDictionary;

use crate::flow::XYPosition;

const X_KEY: &str = "x";
const Y_KEY: &str = "y";

/// Read the stored position; both coordinates must be present and finite
pub fn get_position(specification: &str) -> Option<XYPosition> {
    read_position(&SpecificationDictionary::parse(specification))
}

pub fn read_position(dictionary: &SpecificationDictionary) -> Option<XYPosition> {
    let x = read_coordinate(dictionary, X_KEY)?;
    let y = read_coordinate(dictionary, Y_KEY)?;
    Some(XYPosition::new(x, y))
}

/// Write (or with `None`, delete) the position, returning the new
/// specification string
pub fn set_position(specification: &str, position: Option<XYPosition>) -> String {
    let mut dictionary = SpecificationDictionary::parse(specification);
    write_position(&mut dictionary, position);
    dictionary.to_string()
}

pub fn write_position(dictionary: &mut SpecificationDictionary, position: Option<XYPosition>) {
    match clamp_position(position) {
        Some(position) => {
            dictionary.set(X_KEY, (position.x as i32).to_string());
            dictionary.set(Y_KEY, (position.y as i32).to_string());
        }
        None => {
            dictionary.delete(X_KEY);
            dictionary.delete(Y_KEY);
        }
    }
}

/// Truncate both coordinates to 32-bit integers
pub fn clamp_position(position: Option<XYPosition>) -> Option<XYPosition> {
    position.map(|position| {
        XYPosition::new(
            f64::from(to_int32(position.x)),
            f64::from(to_int32(position.y)),
        )
    })
}

/// Exact comparison; two absent positions are equal
pub fn positions_equal(left: Option<XYPosition>, right: Option<XYPosition>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => left.x == right.x && left.y == right.y,
        (None, None) => true,
        _ => false,
    }
}

fn read_coordinate(dictionary: &SpecificationDictionary, key: &str) -> Option<f64> {
    let value: f64 = dictionary.get(key)?.trim().parse().ok()?;
    value.is_finite().then(|| f64::from(to_int32(value)))
}

/// Truncate toward zero and wrap into the 32-bit signed range
fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    (value.trunc() % 4_294_967_296.0) as i64 as i32
}
