/// Split directive arguments on unquoted whitespace.
///
/// A token may be wrapped in single or double quotes; the quotes are stripped
/// and embedded whitespace is kept. An unterminated quote runs to the end of
/// the input.
pub fn tokenize(input: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut current = String::new();
	let mut quote: Option<char> = None;

	for c in input.chars() {
		match quote {
			Some(q) if c == q => quote = None,
			Some(_) => current.push(c),
			None if c == '"' || c == '\'' => quote = Some(c),
			None if c.is_whitespace() => {
				if !current.is_empty() {
					tokens.push(std::mem::take(&mut current));
				}
			}
			None => current.push(c),
		}
	}

	if !current.is_empty() {
		tokens.push(current);
	}

	tokens
}

/// True if the token is a `[...]` flag block.
pub fn is_flag_block(token: &str) -> bool {
	token.len() >= 2 && token.starts_with('[') && token.ends_with(']')
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_tokenize_plain_whitespace() {
		assert_eq!(
			tokenize("^(.*)$   /index.php\t[L]"),
			vec!["^(.*)$", "/index.php", "[L]"]
		);
	}

	#[test]
	fn test_tokenize_quoted_tokens() {
		assert_eq!(
			tokenize(r#"%{HTTP_USER_AGENT} "Mozilla 5" [NC]"#),
			vec!["%{HTTP_USER_AGENT}", "Mozilla 5", "[NC]"]
		);
		assert_eq!(tokenize("'a b' c"), vec!["a b", "c"]);
	}

	#[test]
	fn test_tokenize_other_quote_inside_quotes() {
		assert_eq!(tokenize(r#""it's" x"#), vec!["it's", "x"]);
	}

	#[test]
	fn test_tokenize_unterminated_quote() {
		assert_eq!(tokenize(r#"a "b c"#), vec!["a", "b c"]);
	}

	#[test]
	fn test_tokenize_empty() {
		assert!(tokenize("   ").is_empty());
	}

	#[test]
	fn test_is_flag_block() {
		assert!(is_flag_block("[L]"));
		assert!(is_flag_block("[]"));
		assert!(!is_flag_block("["));
		assert!(!is_flag_block("/path[1]x"));
	}
}
