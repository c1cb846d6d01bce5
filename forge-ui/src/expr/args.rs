/// Split a function argument list on top-level commas.
///
/// Commas inside single or double quotes, or inside nested parentheses, do
/// not split. A quote preceded by a backslash does not open or close a
/// string. Each argument is trimmed; a trailing empty argument is dropped.
pub fn split_arguments(args: &str) -> Vec<String> {
    if args.trim().is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut prev: Option<char> = None;

    for ch in args.chars() {
        let escaped = prev == Some('\\');
        prev = Some(ch);

        match ch {
            '\'' if !in_double && !escaped => in_single = !in_single,
            '"' if !in_single && !escaped => in_double = !in_double,
            _ if in_single || in_double => {}
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }

        current.push(ch);
    }

    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }

    out
}
