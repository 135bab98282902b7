//! Deterministic, human-friendly slug generation.
//!
//! Bridges ASCII slugification (`slug` crate) with Chinese transliteration
//! (`pinyin` crate) so a title like “城市庆典” becomes `cheng-shi-qing-dian`.
//! Callers supply the uniqueness predicate, keeping the derivation pure.

use std::future::Future;

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Errors that can occur while generating a slug via an async uniqueness check.
#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Produce a slug that does not collide according to the supplied predicate.
///
/// The `is_unique` closure must resolve to `true` when the candidate does not
/// already exist (for example, after probing a repository). Collisions retry
/// with a monotonic counter suffix (`-2`, `-3`, …).
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            None => {
                // Preserve unhandled characters so slugify can decide how to filter them.
                output.push(ch);
            }
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Mutex;

    #[test]
    fn derive_slug_transliterates_chinese() {
        let slug = derive_slug("Festival 城市庆典").expect("slug");
        assert_eq!(slug, "festival-cheng-shi-qing-dian");
    }

    #[test]
    fn derive_slug_rejects_blank_titles() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[tokio::test]
    async fn unique_slug_appends_counter_on_collision() {
        let existing = Mutex::new(vec!["spring-fair".to_string()]);

        let slug = generate_unique_slug_async("Spring Fair", |candidate| {
            let candidate = candidate.to_string();
            let taken = existing.lock().unwrap().contains(&candidate);
            if !taken {
                existing.lock().unwrap().push(candidate.clone());
            }
            async move { Ok::<bool, Infallible>(!taken) }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "spring-fair-2");
        assert!(existing.lock().unwrap().contains(&slug));
    }

    #[tokio::test]
    async fn unique_slug_exhausts_after_bounded_attempts() {
        let result = generate_unique_slug_async("Anniversary", |_| async {
            Ok::<bool, Infallible>(false)
        })
        .await;

        match result {
            Err(SlugAsyncError::Slug(SlugError::Exhausted { base })) => {
                assert_eq!(base, "anniversary");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
