use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::NO_METHOD_NAME_FOUND;

static EXTERNAL_CODE_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+:\d+:\d+\.\d+ \(\d+\)\|CODE_UNIT_STARTED\|\[EXTERNAL\]\|\w+\|([^\r\n]+)")
        .expect("valid code unit pattern")
});

/// Method descriptor of the first externally invoked code unit, or
/// [`NO_METHOD_NAME_FOUND`].
pub fn extract_method_name(log_text: &str) -> String {
    EXTERNAL_CODE_UNIT
        .captures(log_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_METHOD_NAME_FOUND.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_external_method() {
        let text = "10:00:00.0 (123)|CODE_UNIT_STARTED|[EXTERNAL]|01p|MyClass.myMethod";
        assert_eq!(extract_method_name(text), "MyClass.myMethod");
    }

    #[test]
    fn missing_marker_yields_sentinel() {
        assert_eq!(extract_method_name("59.0 APEX_CODE,FINEST"), NO_METHOD_NAME_FOUND);
        assert_eq!(extract_method_name(""), NO_METHOD_NAME_FOUND);
    }

    #[test]
    fn first_match_wins_and_stops_at_line_end() {
        let text = "59.0 APEX_CODE,FINEST;APEX_PROFILING,INFO\r\n\
            09:12:01.3 (3456789)|USER_INFO|[EXTERNAL]|005x|a@b.com\r\n\
            09:12:01.3 (3502011)|CODE_UNIT_STARTED|[EXTERNAL]|066xx|VF: /apex/Home\r\n\
            09:12:01.4 (4001234)|CODE_UNIT_STARTED|[EXTERNAL]|01pxx|Other.run\r\n";
        assert_eq!(extract_method_name(text), "VF: /apex/Home");
    }

    #[test]
    fn internal_code_units_are_ignored() {
        let text = "10:00:00.0 (1)|CODE_UNIT_STARTED|[5]|01p|Inner.call\n";
        assert_eq!(extract_method_name(text), NO_METHOD_NAME_FOUND);
    }
}
