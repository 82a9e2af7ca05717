//! Word wrapping for console log lines

/// Wraps each line of `text` at word boundaries so no line exceeds `max_width`.
/// Words longer than the width are kept whole on their own line.
pub fn wrap_text(text: &str, max_width: usize) -> String {
    let max_width = max_width.max(1);
    let mut out: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.chars().count() <= max_width {
            out.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };

            if needed > max_width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_text() {
        assert_eq!(wrap_text("Short text", 80), "Short text");
    }

    #[test]
    fn test_wrap_long_text() {
        let text = "MP4Box -add /tmp/dv_tmp/movie.x1/BL_RPU.hevc:dvp=8.1 -add audio_0.eac3 -brand mp42isom -ab dby1 -new movie.mp4";
        let result = wrap_text(text, 40);
        assert!(result.contains('\n'));
        for line in result.lines() {
            assert!(line.len() <= 40 || !line.contains(' '));
        }
    }

    #[test]
    fn test_wrap_keeps_long_word() {
        let path = "/a/very/long/path/that/cannot/be/split/anywhere/at/all.mkv";
        assert_eq!(wrap_text(path, 10), path);
    }

    #[test]
    fn test_wrap_multiline() {
        let text = "Line one\nLine two that is very long and should be wrapped to fit within the maximum width";
        let result = wrap_text(text, 40);
        assert!(result.lines().count() > 2);
        assert!(result.starts_with("Line one\n"));
    }
}
