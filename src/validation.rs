//! Small validators shared by configuration checks.
use std::net::SocketAddr;
use std::ops::RangeInclusive;

/// Validates if a given string is a valid `host:port` socket address.
///
/// Port 0 is rejected since the server must bind a known port.
///
/// # Returns
///
/// * `Ok(())` if the address is valid.
/// * `Err(&'static str)` if the address is invalid.
pub fn is_valid_socket_addr(addr: &str) -> Result<(), &'static str> {
    let parsed: SocketAddr = addr.parse().map_err(|_| "Invalid socket address")?;
    if parsed.port() > 0 {
        Ok(())
    } else {
        Err("Port number must be greater than 0")
    }
}

/// Validates if a given string is a usable file path.
pub fn is_valid_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("File path cannot be empty");
    }
    if path.contains('\0') {
        return Err("File path cannot contain null bytes");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
///
/// # Arguments
///
/// * `value` - The value to validate.
/// * `range` - The inclusive range to validate against.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty.
pub fn is_not_empty(value: &str) -> Result<(), &'static str> {
    if !value.is_empty() {
        Ok(())
    } else {
        Err("Value cannot be empty")
    }
}
