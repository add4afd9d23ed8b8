//! Content policy filter
//!
//! Banned-word screening applied synchronously before a post insert.
//! On a match the write is never attempted and the caller learns the
//! exact word that tripped.

use crate::data::BannedWord;

/// Check post text against the banned-word list
///
/// Case-insensitive substring match. An entry without a scoping profile
/// id applies to every author; a scoped entry only to that author. First
/// match in list order wins.
pub fn check_banned<'a>(
    text: &str,
    author_id: &str,
    words: &'a [BannedWord],
) -> Option<&'a BannedWord> {
    let haystack = text.to_lowercase();

    words.iter().find(|entry| {
        let in_scope = match &entry.profile_id {
            None => true,
            Some(scope) => scope == author_id,
        };
        in_scope && !entry.word.is_empty() && haystack.contains(&entry.word.to_lowercase())
    })
}
