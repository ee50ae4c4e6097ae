//! 翻訳テキストの事前検証

use crate::config::ValidationError;

/// 複数形の数と空テキストを検証する
///
/// # Arguments
/// * `translations` - 複数形ごとのテキスト
/// * `expected_forms` - Context の言語で期待される複数形の数
///
/// # Errors
/// - 複数形の数が一致しない
/// - すべての形が空
pub(crate) fn validate_translations(
    translations: &[String],
    expected_forms: usize,
) -> Result<(), ValidationError> {
    if translations.len() != expected_forms {
        return Err(ValidationError::new(
            "translations",
            format!(
                "Expected {expected_forms} plural form(s) for this language, got {}",
                translations.len()
            ),
        ));
    }

    if translations.iter().all(|form| form.trim().is_empty()) {
        return Err(ValidationError::new("translations", "The translation cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;

    fn forms(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case::singular(&["Bonjour"], 1)]
    #[case::two_forms(&["%d fichier", "%d fichiers"], 2)]
    #[case::one_form_blank(&["%d plik", "", "%d plików"], 3)]
    fn test_valid(#[case] values: &[&str], #[case] expected: usize) {
        assert_that!(validate_translations(&forms(values), expected), ok(anything()));
    }

    #[rstest]
    #[case::too_few(&["Bonjour"], 2, "Expected 2 plural form(s)")]
    #[case::too_many(&["a", "b", "c"], 2, "got 3")]
    #[case::no_forms(&[], 1, "got 0")]
    #[case::empty(&[""], 1, "cannot be empty")]
    #[case::whitespace_only(&["  ", "\t"], 2, "cannot be empty")]
    fn test_invalid(#[case] values: &[&str], #[case] expected: usize, #[case] message: &str) {
        let result = validate_translations(&forms(values), expected);

        assert_that!(
            result,
            err(all![
                field!(ValidationError.field_path, eq("translations")),
                field!(ValidationError.message, contains_substring(message))
            ])
        );
    }
}
