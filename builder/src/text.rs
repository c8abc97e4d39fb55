// SPDX-FileCopyrightText: 2026 Engine Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! String-view helpers for picking apart file names without copying.
//!
//! `&str` already is the non-owning view, and `std` covers trimming,
//! prefix/suffix tests and equality; this module only adds the
//! mutate-the-view chopping operations the driver parses names with.

/// Splits `view` at the first occurrence of `delim`: returns the prefix and
/// leaves the remainder (with the delimiter consumed) in `view`. If `delim`
/// does not occur, the whole view is returned and `view` becomes empty.
pub fn chop_by_delimiter<'a>(view: &mut &'a str, delim: char) -> &'a str {
    match view.find(delim) {
        Some(at) => {
            let prefix = &view[..at];
            *view = &view[at + delim.len_utf8()..];
            prefix
        }
        None => {
            let whole = *view;
            *view = &whole[whole.len()..];
            whole
        }
    }
}

/// Splits off at most `n` characters from the front of `view`, returning them
/// and leaving the rest in `view`.
pub fn chop_left<'a>(view: &mut &'a str, n: usize) -> &'a str {
    let at = view
        .char_indices()
        .nth(n)
        .map(|(at, _)| at)
        .unwrap_or(view.len());
    let prefix = &view[..at];
    *view = &view[at..];
    prefix
}

/// The final component of a path: everything after the last `/` separator
/// (also `\` on Windows), or the whole path if there is none.
pub fn path_file_name(path: &str) -> &str {
    let after_slash = path.rfind('/').map(|at| at + 1).unwrap_or(0);
    let after_backslash = if cfg!(windows) {
        path.rfind('\\').map(|at| at + 1).unwrap_or(0)
    } else {
        0
    };
    &path[after_slash.max(after_backslash)..]
}

#[cfg(test)]
mod tests {
    use super::{chop_by_delimiter, chop_left, path_file_name};

    #[test]
    fn chop_by_delimiter_splits_at_the_first_occurrence() {
        let mut view = "triangle.frag.slang";
        assert_eq!(chop_by_delimiter(&mut view, '.'), "triangle");
        assert_eq!(view, "frag.slang");
    }

    #[test]
    fn chop_by_delimiter_without_a_delimiter_consumes_the_view() {
        let mut view = "no-extension";
        assert_eq!(chop_by_delimiter(&mut view, '.'), "no-extension");
        assert_eq!(view, "");
        // Chopping an already-empty view stays empty.
        assert_eq!(chop_by_delimiter(&mut view, '.'), "");
        assert_eq!(view, "");
    }

    #[test]
    fn chop_left_takes_at_most_n_characters() {
        let mut view = "abcdef";
        assert_eq!(chop_left(&mut view, 2), "ab");
        assert_eq!(view, "cdef");
        assert_eq!(chop_left(&mut view, 100), "cdef");
        assert_eq!(view, "");
    }

    #[test]
    fn path_file_name_strips_directories() {
        assert_eq!(path_file_name("res/shaders/a.slang"), "a.slang");
        assert_eq!(path_file_name("plain"), "plain");
        assert_eq!(path_file_name("trailing/"), "");
    }
}
