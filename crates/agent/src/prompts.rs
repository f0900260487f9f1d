//! System prompts and answer rules for the generation backend.

use coinsage_core::plan::Language;
use coinsage_core::session::Turn;

pub const CRYPTO_SYSTEM: &str = "You are an agentic crypto research assistant.\n\
You have access to tool outputs (market data, news, token profile, DEX pool stats).\n\
Write the final answer in the SAME language as the user unless explicitly asked otherwise.\n\
Be concrete and practical. Avoid filler.\n\
Do not expose private chain-of-thought.\n\
Always include a short 'Not financial advice' sentence.\n";

pub const GENERAL_SYSTEM: &str = "You are a helpful assistant.\n\
Answer in the SAME language as the user unless explicitly asked otherwise.\n\
Avoid generic refusals; if something is missing, ask for the minimum detail.\n";

/// Formatting rules appended to the crypto synthesis request.
pub const ANSWER_RULES: &str = "Write a compact answer in markdown.\n\
- Keep it short but actionable (~12-18 lines)\n\
- Use headings 'Summary' and 'Action plan' (in the user's language)\n\
- Do NOT include any images (no markdown image syntax); the UI header already shows the token.\n\
- If RSI/MACD are not available (DEX-only), say so briefly\n\
- Action plan must be concrete:\n\
  - 1 bullish scenario trigger + what to do\n\
  - 1 bearish scenario trigger + what to do\n\
  - 1 invalidation / risk control rule (e.g., stop / max loss / position sizing)\n\
  - 2 things to watch (news/catalysts/levels)\n\
- End with a short sources list\n\
- Include one short 'Not financial advice' sentence\n";

/// System line pinning the answer language.
pub fn language_instruction(language: Option<Language>) -> String {
    let name = language.unwrap_or(Language::En).display_name();
    format!("Answer in {name}.")
}

/// Classification prompt for the planner. Asks for strict JSON only.
pub fn planner_prompt(
    query: &str,
    summary: &str,
    recent_turns: &[Turn],
    last_symbol: Option<&str>,
) -> String {
    let recent_text = recent_turns
        .iter()
        .map(|t| format!("{}: {}", t.role, t.content))
        .collect::<Vec<_>>()
        .join("\n");
    let last_asset = last_symbol.unwrap_or("(none)");

    format!(
        "You are a planner for an agentic crypto researcher.\n\
         Decide whether the user asks about a specific crypto asset (token/coin). \
         If yes, extract the asset query.\n\
         If they ask a general question (including crypto education), choose 'general'.\n\
         Use conversation context for coreference (e.g. 'buy it' refers to the last asset).\n\n\
         When you output asset_query:\n\
         - Keep it VERY short (1-3 words max)\n\
         - Prefer ticker or the distinctive token name\n\
         - Do NOT include generic words like 'coin', 'token', 'crypto'\n\
         - Do NOT include the full question\n\n\
         Memory summary:\n{summary}\n\n\
         Recent turns:\n{recent_text}\n\n\
         Last researched asset: {last_asset}\n\n\
         User question:\n{query}\n\n\
         Return JSON only with keys:\n\
         - intent: 'crypto' or 'general'\n\
         - asset_query: string or null (short; coin name/ticker/token keyword)\n\
         - language: 'it' or 'en' (match the user's language)\n"
    )
}

/// Deterministic disambiguation reply, emitted without invoking the
/// generation backend.
pub fn ambiguous_answer(language: Option<Language>, asset_query: Option<&str>, n: usize) -> String {
    let query = asset_query.unwrap_or("that asset");
    match (language, n) {
        (Some(Language::It), 0) => format!(
            "Non sono riuscito ad associare \"{query}\" a nessun mercato conosciuto. \
             Indica la chain e il contract address del token, cosi posso analizzarlo."
        ),
        (Some(Language::It), n) => format!(
            "\"{query}\" corrisponde a piu mercati. Scegli uno dei {n} pool candidati \
             (rispondi con il suo id), oppure indica chain e contract address."
        ),
        (_, 0) => format!(
            "I couldn't match \"{query}\" to any known market. \
             Share the chain and contract address and I'll analyze it directly."
        ),
        (_, n) => format!(
            "\"{query}\" matches more than one market. Pick one of the {n} candidate \
             pools (reply with its id), or share the chain and contract address."
        ),
    }
}
