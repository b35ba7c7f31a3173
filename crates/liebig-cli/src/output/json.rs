use liebig_core::error::LiebigError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), LiebigError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
