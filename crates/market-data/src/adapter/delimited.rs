use crate::errors::MarketDataError;
use crate::models::RawPayload;

/// Find `{prefix}{symbol}=` and split the quoted value that follows.
pub(super) fn locate_fields<'t>(
    payload: &RawPayload,
    text: &'t str,
    prefix: &str,
    delimiter: char,
) -> Result<Vec<&'t str>, MarketDataError> {
    let marker = format!("{}{}=", prefix, payload.symbol);
    let start = text.find(&marker).ok_or_else(|| {
        MarketDataError::format(&payload.provider, format!("assignment {} not found", marker))
    })?;

    let value = strip_assignment(&text[start + marker.len()..]);
    if value.is_empty() {
        return Err(MarketDataError::format(
            &payload.provider,
            format!("empty record for {}", payload.symbol),
        ));
    }

    Ok(value.split(delimiter).map(str::trim).collect())
}

/// `"a,b,c";\n...` -> `a,b,c`
fn strip_assignment(rest: &str) -> &str {
    let rest = rest.trim_start();
    match rest.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or_default(),
        None => rest
            .split(|c| c == ';' || c == '\n')
            .next()
            .unwrap_or_default()
            .trim(),
    }
}
