/// Splits mixed Chinese/ASCII text into retrieval terms.
///
/// Han runs become overlapping character bigrams (a lone character is kept as
/// a unigram), ASCII words are lower-cased and numbers are kept whole with
/// thousands separators removed. Everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if is_han(c) {
            let start = i;
            while i < chars.len() && is_han(chars[i]) {
                i += 1;
            }
            push_bigrams(&chars[start..i], &mut tokens);
        } else if c.is_ascii_digit() {
            let mut number = String::new();
            while i < chars.len() {
                let ch = chars[i];
                let joins_digits = (ch == '.' || ch == ',')
                    && chars.get(i + 1).is_some_and(|next| next.is_ascii_digit());
                if ch.is_ascii_digit() {
                    number.push(ch);
                } else if joins_digits {
                    if ch == '.' {
                        number.push(ch);
                    }
                } else {
                    break;
                }
                i += 1;
            }
            tokens.push(number);
        } else if c.is_ascii_alphabetic() {
            let mut word = String::new();
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                word.push(chars[i].to_ascii_lowercase());
                i += 1;
            }
            tokens.push(word);
        } else {
            i += 1;
        }
    }

    tokens
}

fn push_bigrams(run: &[char], tokens: &mut Vec<String>) {
    if run.len() == 1 {
        tokens.push(run[0].to_string());
        return;
    }
    for pair in run.windows(2) {
        tokens.push(pair.iter().collect());
    }
}

pub fn is_han(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{f900}'..='\u{faff}'
    )
}
