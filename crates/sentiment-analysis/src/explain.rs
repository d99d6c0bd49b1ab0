//! Deterministic explanations used when text generation is unavailable.

use chrono::{Duration, NaiveDate};
use market_core::{DayAnalysis, Recommendation, SentimentLabel, Trend};

const ROSE: &str = "Price increased slightly due to rising market optimism or positive sentiment.";
const FELL: &str = "Price decreased as a result of profit-taking or temporary market pullback.";
const FLAT: &str = "Price remains stable as market waits for further signals.";

/// Day-over-day trend; day one compares against itself.
fn trends(predictions: &[f64]) -> impl Iterator<Item = Trend> + '_ {
    predictions.iter().enumerate().map(|(i, today)| {
        let yesterday = if i > 0 { predictions[i - 1] } else { *today };
        if *today > yesterday {
            Trend::Uptrend
        } else if *today < yesterday {
            Trend::Downtrend
        } else {
            Trend::Sideways
        }
    })
}

fn reason(trend: Trend) -> &'static str {
    match trend {
        Trend::Uptrend => ROSE,
        Trend::Downtrend => FELL,
        Trend::Sideways => FLAT,
    }
}

/// One "Day N: ..." line per predicted value.
pub fn fallback_explanations(predictions: &[f64]) -> Vec<String> {
    trends(predictions)
        .enumerate()
        .map(|(i, trend)| format!("Day {}: {}", i + 1, reason(trend)))
        .collect()
}

/// Structured per-day analysis built from the same rules, dated from `start`.
pub fn fallback_day_analysis(start: NaiveDate, predictions: &[f64]) -> Vec<DayAnalysis> {
    trends(predictions)
        .zip(predictions)
        .enumerate()
        .map(|(i, (trend, price))| DayAnalysis {
            date: start + Duration::days(i as i64),
            predicted_price: (price * 100.0).round() / 100.0,
            trend,
            action: match trend {
                Trend::Uptrend => Recommendation::Buy,
                Trend::Downtrend => Recommendation::Sell,
                Trend::Sideways => Recommendation::Hold,
            },
            reason: reason(trend).to_string(),
        })
        .collect()
}

/// Overall outlook for a horizon, from first to last predicted value.
pub fn fallback_outlook(coin: &str, predictions: &[f64]) -> String {
    match (predictions.first(), predictions.last()) {
        (Some(first), Some(last)) if predictions.len() > 1 => {
            let change = if *first != 0.0 { (last - first) / first * 100.0 } else { 0.0 };
            let direction = if change > 0.0 {
                "an upward"
            } else if change < 0.0 {
                "a downward"
            } else {
                "a flat"
            };
            format!(
                "The model projects {} path for {} over the next {} days ({:+.2}%), from {:.2} to {:.2}. \
                 Treat the forecast as one signal among many.",
                direction,
                coin,
                predictions.len(),
                change,
                first,
                last
            )
        }
        (Some(only), _) => format!("The model projects {} at {:.2} for the next day.", coin, only),
        _ => format!("No forecast is available for {}.", coin),
    }
}

/// News summary used when the generator cannot be reached.
pub fn fallback_news_summary(coin: &str, label: SentimentLabel, score: f64, headlines: usize) -> String {
    if headlines == 0 {
        return "No news data available to summarize.".to_string();
    }
    format!(
        "Across {} recent headlines about {}, news sentiment reads {} (average polarity {:.2}).",
        headlines,
        coin,
        label.as_str().to_lowercase(),
        score
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explanations_follow_direction() {
        let lines = fallback_explanations(&[100.0, 101.0, 99.0, 99.0]);
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "Day 1: Price remains stable as market waits for further signals."
        );
        assert_eq!(
            lines[1],
            "Day 2: Price increased slightly due to rising market optimism or positive sentiment."
        );
        assert_eq!(
            lines[2],
            "Day 3: Price decreased as a result of profit-taking or temporary market pullback."
        );
        assert!(lines[3].starts_with("Day 4: Price remains stable"));
    }

    #[test]
    fn test_day_analysis_dates_and_actions() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        let days = fallback_day_analysis(start, &[10.0, 11.004, 9.0]);
        assert_eq!(days[0].date, start);
        assert_eq!(days[2].date.to_string(), "2025-02-01");
        assert_eq!(days[1].predicted_price, 11.0);
        assert_eq!(days[1].action, Recommendation::Buy);
        assert_eq!(days[2].trend, Trend::Downtrend);
    }

    #[test]
    fn test_outlook_and_summary_text() {
        assert!(fallback_outlook("BTCUSDT", &[100.0, 110.0]).contains("upward"));
        assert!(fallback_outlook("BTCUSDT", &[]).contains("No forecast"));
        assert_eq!(
            fallback_news_summary("BTCUSDT", SentimentLabel::Neutral, 0.0, 0),
            "No news data available to summarize."
        );
    }
}
