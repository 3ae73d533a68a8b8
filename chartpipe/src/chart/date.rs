//! Date range formatting.

/// Formats the range of retained observation dates.
///
/// ISO-8601 dates compare lexically, so min/max need no parsing. Equal
/// min and max collapse to a single date; otherwise the range is a
/// "from – to" string.
pub fn date_range<'a, I>(dates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut min: Option<&str> = None;
    let mut max: Option<&str> = None;
    for date in dates {
        if date.is_empty() {
            continue;
        }
        min = Some(match min {
            Some(m) if m <= date => m,
            _ => date,
        });
        max = Some(match max {
            Some(m) if m >= date => m,
            _ => date,
        });
    }
    match (min, max) {
        (Some(min), Some(max)) if min == max => min.to_string(),
        (Some(min), Some(max)) => format!("{} – {}", min, max),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_date_collapses() {
        assert_eq!(date_range(["2020", "2020"]), "2020");
    }

    #[test]
    fn test_range_formats_min_to_max() {
        assert_eq!(date_range(["2021", "2019", "2020"]), "2019 – 2021");
    }

    #[test]
    fn test_empty_input_yields_empty_string() {
        assert_eq!(date_range([]), "");
        assert_eq!(date_range([""]), "");
    }
}
