//! The HTML status page.

use chrono::{DateTime, Utc};

use crate::scoring::Category;
use crate::store::GlobalStats;

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    min-height: 100vh;
    padding: 20px;
}
.container {
    max-width: 800px;
    margin: 0 auto;
    background: white;
    border-radius: 20px;
    padding: 30px;
    color: #333;
}
h1 { color: #2c3e50; text-align: center; margin-bottom: 20px; }
.status { background: #4CAF50; color: white; padding: 10px 20px; border-radius: 10px; text-align: center; margin: 20px 0; }
.card { background: #f8f9fa; padding: 20px; border-radius: 15px; margin: 20px 0; }
.grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 15px; margin: 20px 0; }
.stats { grid-template-columns: repeat(2, 1fr); }
.item { text-align: center; padding: 15px; border-radius: 10px; border: 2px solid #ddd; }
.value { font-size: 2em; font-weight: bold; color: #667eea; }
.btn { display: inline-block; background: #667eea; color: white; padding: 12px 24px; border-radius: 10px; text-decoration: none; margin: 10px 5px; }
footer { text-align: center; margin-top: 30px; color: #666; }
@media (max-width: 600px) { .grid { grid-template-columns: repeat(2, 1fr); } }
"#;

/// Escape text for an HTML body or attribute.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn render(stats: &GlobalStats, bot_username: &str, now: DateTime<Utc>) -> String {
    let username = escape(bot_username);
    let rubric: String = Category::ALL
        .iter()
        .map(|c| {
            format!(
                r#"<div class="item"><div>{}</div><small>up to {}%</small></div>"#,
                escape(c.title()),
                c.max_score()
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Productivity Bot Dashboard</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<style>{STYLE}</style>
</head>
<body>
<div class="container">
<h1>🤖 Productivity Bot</h1>
<div class="status">🟢 Bot is running | Users: {users}</div>
<div class="card">
<h2>🚀 Quick start</h2>
<p>1. Find the bot in Telegram: <strong>@{username}</strong></p>
<p>2. Send <code>/start</code></p>
<p>3. Press "📅 Today" and mark what you did</p>
<p>4. Press "🏁 Finish day"</p>
</div>
<div class="grid">{rubric}</div>
<div class="grid stats">
<div class="item"><div>📊 Maximum score</div><div class="value">100%</div></div>
<div class="item"><div>📅 Days tracked</div><div class="value">{days}</div></div>
<div class="item"><div>🏆 Perfect days</div><div class="value">{perfect}</div></div>
<div class="item"><div>✅ Average score</div><div class="value">{avg:.1}%</div></div>
</div>
<div style="text-align: center;">
<a href="https://t.me/{username}" class="btn" target="_blank">🤖 Open in Telegram</a>
<a href="/api/stats" class="btn">📊 API stats</a>
<a href="/health" class="btn">🏥 Health check</a>
</div>
<footer><p>Updated: {updated}</p></footer>
</div>
</body>
</html>
"#,
        users = stats.users_count,
        days = stats.days_count,
        perfect = stats.perfect_days,
        avg = stats.avg_score,
        updated = now.format("%Y-%m-%d %H:%M UTC"),
    )
}
