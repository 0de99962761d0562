//! Notification content for price-drop and target-reached messages

use crate::models::notification::{AlertKind, NotificationMessage};
use crate::models::watch::WatchedProduct;

const SUBJECT_NAME_CHARS: usize = 30;
const TITLE_NAME_CHARS: usize = 50;

/// Extra content for the target-reached path
#[derive(Debug, Clone, PartialEq)]
pub enum MessageDetails {
    PriceDrop,
    TargetReached {
        target_price: i64,
        registered_price: Option<i64>,
        savings: i64,
        recommendation: Option<String>,
    },
}

/// Truncates to at most `max` characters (not bytes)
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// `1980` -> `¥1,980`
pub fn format_yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-¥{}", grouped)
    } else {
        format!("¥{}", grouped)
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn short_name(name: &str, max: usize) -> String {
    if name.chars().count() > max {
        format!("{}...", truncate_chars(name, max))
    } else {
        name.to_string()
    }
}

pub fn render(
    product: &WatchedProduct,
    old_price: i64,
    new_price: i64,
    drop_rate: f64,
    details: MessageDetails,
) -> NotificationMessage {
    let name = short_name(&product.name, SUBJECT_NAME_CHARS);
    let image_tag = product
        .image_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<img src="{}" alt="{}" style="max-width: 200px;">"#,
                escape_html(url),
                escape_html(&product.name)
            )
        })
        .unwrap_or_default();

    let price_line = format!(
        r#"<p style="font-size: 18px; margin: 0;"><span style="text-decoration: line-through; color: #999;">{}</span> → <span style="color: #e74c3c; font-weight: bold; font-size: 24px;">{}</span></p>"#,
        format_yen(old_price),
        format_yen(new_price)
    );

    let (kind, target_price, registered_price, savings, recommendation) = match details {
        MessageDetails::PriceDrop => (AlertKind::PriceDrop, None, None, None, None),
        MessageDetails::TargetReached {
            target_price,
            registered_price,
            savings,
            recommendation,
        } => (
            AlertKind::TargetReached,
            Some(target_price),
            registered_price,
            Some(savings),
            recommendation,
        ),
    };

    let (subject, heading, mut detail_html, mut text) = match (kind, target_price, savings) {
        (AlertKind::TargetReached, Some(target), Some(saved)) => (
            format!("【目標価格達成】{} が {} になりました", name, format_yen(new_price)),
            "🎯 目標価格達成",
            format!(
                r#"<p style="color: #27ae60; font-weight: bold; margin: 10px 0 0 0;">目標価格 {} を達成しました（登録時から {} お得！）</p>"#,
                format_yen(target),
                format_yen(saved)
            ),
            format!(
                "{}\n{} → {}\n目標価格 {} を達成（{} お得）\n",
                product.name,
                format_yen(old_price),
                format_yen(new_price),
                format_yen(target),
                format_yen(saved)
            ),
        ),
        _ => (
            format!("【値下げ通知】{} が {:.1}% 値下げ！", name, drop_rate.abs()),
            "📉 値下げ通知",
            format!(
                r#"<p style="color: #27ae60; font-weight: bold; margin: 10px 0 0 0;">{:.1}% OFF（{} お得！）</p>"#,
                drop_rate.abs(),
                format_yen(old_price - new_price)
            ),
            format!(
                "{}\n{} → {}（{:.1}% OFF）\n",
                product.name,
                format_yen(old_price),
                format_yen(new_price),
                drop_rate.abs()
            ),
        ),
    };

    if let Some(rec) = &recommendation {
        detail_html.push_str(&format!(
            r#"<p style="margin: 16px 0 0 0;">{}</p>"#,
            escape_html(rec)
        ));
        text.push_str(&format!("\n{}\n", rec));
    }

    text.push_str(&product.product_url);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h1 style="color: #e74c3c;">{heading}</h1>
{image_tag}
<h2>{name}</h2>
<div style="background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0;">
{price_line}
{detail_html}
</div>
<a href="{url}" style="display: inline-block; background: #3498db; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">商品を見る</a>
</body>
</html>"#,
        heading = heading,
        image_tag = image_tag,
        name = escape_html(&product.name),
        price_line = price_line,
        detail_html = detail_html,
        url = escape_html(&product.product_url),
    );

    NotificationMessage {
        kind,
        product_id: product.id,
        product_name: product.name.clone(),
        product_url: product.product_url.clone(),
        image_url: product.image_url.clone(),
        old_price,
        new_price,
        drop_rate,
        target_price,
        registered_price,
        savings,
        recommendation,
        subject,
        html,
        text,
    }
}

/// Short title stored with the notification record
pub fn record_title(message: &NotificationMessage) -> String {
    let prefix = match message.kind {
        AlertKind::PriceDrop => "【値下げ】",
        AlertKind::TargetReached => "【目標価格達成】",
    };
    format!("{}{}", prefix, truncate_chars(&message.product_name, TITLE_NAME_CHARS))
}

/// One-line summary stored with the notification record
pub fn record_summary(message: &NotificationMessage) -> String {
    format!(
        "{} → {}（{:.1}% OFF）",
        format_yen(message.old_price),
        format_yen(message.new_price),
        message.drop_rate.abs()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn product(name: &str) -> WatchedProduct {
        WatchedProduct {
            id: Uuid::new_v4(),
            name: name.to_string(),
            product_url: "https://item.example/1".to_string(),
            image_url: Some("https://img.example/1.jpg".to_string()),
            current_price: 2980,
            original_price: 3300,
            lowest_price: None,
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(0), "¥0");
        assert_eq!(format_yen(980), "¥980");
        assert_eq!(format_yen(1980), "¥1,980");
        assert_eq!(format_yen(1234567), "¥1,234,567");
        assert_eq!(format_yen(-1500), "-¥1,500");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("バルクオム化粧水", 5), "バルクオム");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_price_drop_subject() {
        let msg = render(&product("Men's Toner"), 2980, 1980, 33.557, MessageDetails::PriceDrop);
        assert_eq!(msg.kind, AlertKind::PriceDrop);
        assert_eq!(msg.subject, "【値下げ通知】Men's Toner が 33.6% 値下げ！");
        assert!(msg.html.contains("¥2,980"));
        assert!(msg.html.contains("¥1,000 お得"));
        assert!(msg.text.ends_with("https://item.example/1"));
        assert_eq!(msg.savings, None);
    }

    #[test]
    fn test_subject_truncates_long_names() {
        let long = "a".repeat(40);
        let msg = render(&product(&long), 2000, 1000, 50.0, MessageDetails::PriceDrop);
        assert!(msg.subject.contains(&format!("{}...", "a".repeat(30))));
    }

    #[test]
    fn test_target_reached_includes_recommendation() {
        let msg = render(
            &product("Toner"),
            1200,
            950,
            20.83,
            MessageDetails::TargetReached {
                target_price: 1000,
                registered_price: Some(1300),
                savings: 350,
                recommendation: Some("Great <value>".to_string()),
            },
        );
        assert_eq!(msg.kind, AlertKind::TargetReached);
        assert_eq!(msg.target_price, Some(1000));
        assert_eq!(msg.savings, Some(350));
        assert!(msg.html.contains("Great &lt;value&gt;"));
        assert!(msg.text.contains("Great <value>"));
    }

    #[test]
    fn test_record_title_and_summary() {
        let msg = render(&product("Toner"), 2980, 1980, 33.56, MessageDetails::PriceDrop);
        assert_eq!(record_title(&msg), "【値下げ】Toner");
        assert_eq!(record_summary(&msg), "¥2,980 → ¥1,980（33.6% OFF）");
    }
}
