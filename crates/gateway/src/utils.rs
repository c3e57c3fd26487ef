//! Gateway utility functions.

/// Expand `${VAR}` and `${VAR:-default}` references with environment
/// variable values.
///
/// Unset variables without a default expand to an empty string. An
/// unterminated `${` is kept as written.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let reference = &rest[start + 2..];
        let Some(end) = reference.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let (name, default) = match reference[..end].split_once(":-") {
            Some((name, default)) => (name, default),
            None => (&reference[..end], ""),
        };
        match std::env::var(name) {
            Ok(value) => result.push_str(&value),
            Err(_) => result.push_str(default),
        }
        rest = &reference[end + 1..];
    }

    result.push_str(rest);
    result
}
