//! Instruction sent ahead of the text to correct.

/// Marker the model appends when the text is too illegible to fix.
pub const SENTINEL_MARKER: &str = "слишком неразборчиво 9905148";

/// Correction instruction, in Russian to match the expected input language.
///
/// Asks for minimal spelling fixes only, with language, line breaks, word
/// order and punctuation left intact, and for [`SENTINEL_MARKER`] at the very
/// end when the text is largely illegible.
pub const CORRECTION_INSTRUCTION: &str = "Исправьте ошибки OCR в тексте, сохраняя оригинальный язык и переносы строк. \
Исправляйте ТОЛЬКО явные орфографические ошибки или неполные слова на основе написания и контекста. \
Не добавляйте и не удаляйте слова, не изменяйте структуру, порядок слов, пунктуацию, смысл \
и самое главное - переносы строк, даже если текст нелогичен. Сводите исправления к минимуму. \
Возвращайте только исправленный текст без дополнительных комментариев. \
если текст довольно неразборчивый, в самом конце добавляй текст \"слишком неразборчиво 9905148\".";

/// Builds the user message: instruction, a blank line, then the text.
pub fn build_prompt(source_text: &str) -> String {
    format!("{CORRECTION_INSTRUCTION}\n\n{source_text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_keeps_text_verbatim() {
        let text = "первая строка\nвторая  строка";
        let prompt = build_prompt(text);

        assert!(prompt.starts_with("Исправьте ошибки OCR"));
        assert!(prompt.ends_with("\n\nпервая строка\nвторая  строка"));
    }

    #[test]
    fn test_instruction_mentions_sentinel() {
        assert!(CORRECTION_INSTRUCTION.contains(SENTINEL_MARKER));
        assert!(!CORRECTION_INSTRUCTION.contains('\n'));
    }
}
