use bilibili::{Comment, Item};
use common::MonitorError;

const ANONYMOUS: &str = "anonymous";
const EMPTY_BODY: &str = "(empty comment)";

/// Comment bodies go on one line so the numbered list stays readable in chat.
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

pub fn format_new_comments(account_id: &str, item: &Item, comments: &[Comment], cap: usize) -> String {
    let mut message = format!(
        "New comments on the latest video of UID {}\nTitle: {}\nLink: {}\n",
        account_id, item.title, item.permalink
    );

    for (index, comment) in comments.iter().take(cap).enumerate() {
        let body = single_line(&comment.body);
        message.push_str(&format!(
            "\n{}. {}: {}\n   {}\n",
            index + 1,
            display_or(&comment.author, ANONYMOUS),
            display_or(&body, EMPTY_BODY),
            comment.permalink
        ));
    }

    if comments.len() > cap {
        message.push_str(&format!("\n...and {} more\n", comments.len() - cap));
    }

    message.trim_end().to_string()
}

pub fn format_heartbeat(account_id: &str, item: &Item) -> String {
    format!(
        "Bilibili monitor (UID {})\nStatus: OK\nLatest video: {}\nLink: {}\nNo new comments since the last check.",
        account_id, item.title, item.permalink
    )
}

pub fn format_alert(account_id: &str, error: &MonitorError) -> String {
    match error {
        MonitorError::NoItems(_) => format!(
            "Bilibili monitor alert\nUID {} has no published videos.",
            account_id
        ),
        other => format!(
            "Bilibili monitor alert\nCheck for UID {} failed: {}",
            account_id, other
        ),
    }
}
