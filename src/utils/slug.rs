//! 由标题派生 slug
//!
//! ASCII 字母数字转小写保留；其他 ASCII 字符的连续段折叠为一个 `-`；
//! 非 ASCII 字符直接丢弃；首尾的 `-` 去除，超长时截断。

const MAX_SLUG_LEN: usize = 80;
const EMPTY_SLUG: &str = "untitled";

pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if ch.is_ascii() && !slug.is_empty() && !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        return EMPTY_SLUG.to_string();
    }
    slug
}
