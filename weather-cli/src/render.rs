use chrono::{DateTime, FixedOffset, Utc};
use weather_core::{WeatherSnapshot, kelvin_to_fahrenheit};

/// Multi-line, human-readable report for a terminal.
pub fn weather_report(title: &str, snapshot: &WeatherSnapshot, now: DateTime<Utc>) -> String {
    let mut lines = Vec::new();
    if !title.is_empty() {
        lines.push(title.to_string());
    }

    if let Some(condition) = snapshot.condition() {
        lines.push(format!("{} ({})", condition.main, condition.description));
    }

    let main = &snapshot.main;
    lines.push(format!(
        "Temperature: {}°F (feels like {}°F), low {}°F / high {}°F",
        kelvin_to_fahrenheit(main.temp),
        kelvin_to_fahrenheit(main.feels_like),
        kelvin_to_fahrenheit(main.temp_min),
        kelvin_to_fahrenheit(main.temp_max),
    ));
    lines.push(format!("Humidity: {}%   Pressure: {} hPa", main.humidity, main.pressure));

    if let Some(wind) = &snapshot.wind {
        match wind.deg {
            Some(deg) => lines.push(format!("Wind: {:.1} m/s from {deg}°", wind.speed)),
            None => lines.push(format!("Wind: {:.1} m/s", wind.speed)),
        }
    }
    if let Some(clouds) = &snapshot.clouds {
        lines.push(format!("Cloud cover: {}%", clouds.all));
    }

    let offset = snapshot.timezone.unwrap_or(0);
    if let Some(sys) = &snapshot.sys {
        let sunrise = sys.sunrise.and_then(|t| local_time(t, offset));
        let sunset = sys.sunset.and_then(|t| local_time(t, offset));
        if let (Some(sunrise), Some(sunset)) = (sunrise, sunset) {
            lines.push(format!("Sunrise: {sunrise}   Sunset: {sunset}"));
        }
    }

    if snapshot.timestamp > 0 {
        lines.push(format!("Updated {}", age_text(now.timestamp_millis() - snapshot.timestamp)));
    }

    lines.join("\n")
}

/// `HH:MM` at the report's UTC offset.
fn local_time(epoch_secs: i64, offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_secs)?;
    let utc = DateTime::from_timestamp(epoch_secs, 0)?;
    Some(utc.with_timezone(&offset).format("%H:%M").to_string())
}

fn age_text(age_ms: i64) -> String {
    let minutes = age_ms / 60_000;
    match minutes {
        m if m < 1 => "just now".to_string(),
        1 => "1 minute ago".to_string(),
        m if m < 120 => format!("{m} minutes ago"),
        m => format!("{} hours ago", m / 60),
    }
}
