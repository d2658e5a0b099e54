use crate::languages::highlight_language;

/// Instruction asking the model to translate `code` between two languages.
///
/// The code is interpolated verbatim; nothing here guards against
/// instructions hidden in pasted code.
pub fn build_conversion_prompt(code: &str, source_language: &str, target_language: &str) -> String {
    let source_token = highlight_language(source_language);
    let target_token = highlight_language(target_language);

    format!(
        "You are an expert code converter. Your task is to convert the following {source_language} code into {target_language}.\n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         1. Provide ONLY the raw, converted code for {target_language}.\n\
         2. DO NOT include any explanations, comments about the conversion, or introductions like \"Here is the converted code:\".\n\
         3. DO NOT wrap the code in markdown backticks (e.g., ```{target_token}```).\n\
         4. Ensure the output is clean and ready to be directly compiled or executed.\n\
         5. Preserve the original logic, structure, and functionality as closely as possible in the target language.\n\
         \n\
         {source_language} Code to Convert:\n\
         ```{source_token}\n\
         {code}\n\
         ```\n"
    )
}

/// Instruction asking the model to reformat PHP code to PSR-12.
pub fn build_format_prompt(php_code: &str) -> String {
    format!(
        "You are an expert PHP code formatter. Your task is to format the following PHP code according to the PSR-12 standard.\n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         1. Provide ONLY the raw, formatted PHP code.\n\
         2. DO NOT include any explanations or introductions.\n\
         3. DO NOT wrap the code in markdown backticks.\n\
         \n\
         PHP Code to Format:\n\
         ```php\n\
         {php_code}\n\
         ```\n"
    )
}
