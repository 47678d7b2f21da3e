/*
 * align.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Word-level text alignment.
 *
 * Renders the inside of a changed text pair: tokenize both strings,
 * align the token arrays with an affine-gap Needleman-Wunsch pass, and
 * post-process the raw operations into display-ready spans. Newlines
 * and non-breaking spaces stay individual tokens because line structure
 * matters in preformatted content; runs of plain spaces collapse.
 */

use serde::Serialize;
use std::ops::Range;

/// Gap-open and gap-extend penalties for the alignment.
const GAP_OPEN: i64 = 10;
const GAP_EXTEND: i64 = 3;

const NEG_INF: i64 = i64::MIN / 4;

/// Kind of an aligned span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Equal,
    Remove,
    Insert,
}

/// A run of aligned tokens.
///
/// Ranges index the token arrays handed to [`compute_edits`]. `Equal`
/// spans cover both sides; `Remove` spans have an empty right range
/// marking the position the tokens vanished at, and `Insert` the
/// mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSpan {
    pub kind: SpanKind,
    pub left: Range<usize>,
    pub right: Range<usize>,
}

impl EditSpan {
    fn equal(left: Range<usize>, right: Range<usize>) -> Self {
        Self {
            kind: SpanKind::Equal,
            left,
            right,
        }
    }

    fn remove(left: Range<usize>, right_at: usize) -> Self {
        Self {
            kind: SpanKind::Remove,
            left,
            right: right_at..right_at,
        }
    }

    fn insert(left_at: usize, right: Range<usize>) -> Self {
        Self {
            kind: SpanKind::Insert,
            left: left_at..left_at,
            right,
        }
    }
}

/// Split text into alignment tokens.
///
/// Boundaries are whitespace and `=` (so attribute values tokenize
/// apart from their names). A run of plain spaces collapses to one
/// space token; newlines and non-breaking spaces each stay their own
/// token. A boundary run containing `=` is kept whole.
pub fn tokenize(text: &str) -> Vec<String> {
    let is_boundary = |c: char| c.is_whitespace() || c == '=';

    let mut tokens = Vec::new();
    let mut iter = text.char_indices().peekable();

    while let Some(&(start, first)) = iter.peek() {
        let boundary = is_boundary(first);
        let mut end = start;
        while let Some(&(i, c)) = iter.peek() {
            if is_boundary(c) != boundary {
                break;
            }
            end = i + c.len_utf8();
            iter.next();
        }
        let run = &text[start..end];

        if !boundary {
            tokens.push(run.to_string());
        } else if run.chars().all(char::is_whitespace) {
            let mut last = '*';
            for c in run.chars() {
                if c == ' ' {
                    if last != ' ' {
                        tokens.push(" ".to_string());
                    }
                } else {
                    tokens.push(c.to_string());
                }
                last = c;
            }
        } else {
            // Contains '=': keep the separator run whole
            tokens.push(run.to_string());
        }
    }

    tokens
}

/// Similarity score for a token pair.
///
/// Equal tokens score mildly positive (a space slightly more, so runs
/// re-anchor on spacing); aligning a newline with anything that is not
/// a newline is heavily penalised so line structure survives.
fn token_score(left: &str, right: &str) -> i64 {
    if left == right {
        if left.starts_with(' ') { 2 } else { 1 }
    } else if left.contains('\n') {
        if right.contains('\n') { 8 } else { -200 }
    } else if right.contains('\n') {
        -200
    } else {
        -100
    }
}

/// Align two token arrays, producing coalesced edit spans.
pub fn compute_edits(left: &[String], right: &[String]) -> Vec<EditSpan> {
    let s = left.len();
    let t = right.len();

    // Anchor on the common prefix and suffix; only the middle needs the
    // quadratic alignment.
    let min_len = s.min(t);
    let mut prefix = 0;
    while prefix < min_len && left[prefix] == right[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < min_len - prefix && left[s - 1 - suffix] == right[t - 1 - suffix] {
        suffix += 1;
    }

    let mut ops: Vec<EditSpan> = Vec::new();
    if prefix > 0 {
        ops.push(EditSpan::equal(0..prefix, 0..prefix));
    }

    let mid_left = &left[prefix..s - suffix];
    let mid_right = &right[prefix..t - suffix];

    if !mid_left.is_empty() && !mid_right.is_empty() {
        align_middle(mid_left, mid_right, prefix, &mut ops);
    } else if !mid_left.is_empty() {
        ops.push(EditSpan::remove(prefix..s - suffix, prefix));
    } else if !mid_right.is_empty() {
        ops.push(EditSpan::insert(prefix, prefix..t - suffix));
    }

    if suffix > 0 {
        push_span(
            &mut ops,
            EditSpan::equal(s - suffix..s, t - suffix..t),
        );
    }

    compress_edits(ops, left, right)
}

/// One traceback move.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Move {
    Diag,
    Up,
    Left,
}

/// Affine-gap alignment of the mismatching middle, appending spans
/// offset by `offset` into the full token arrays.
fn align_middle(left: &[String], right: &[String], offset: usize, ops: &mut Vec<EditSpan>) {
    let s = left.len();
    let t = right.len();
    let cols = t + 1;
    let idx = |i: usize, j: usize| i * cols + j;

    // m: best ending on a token pair; x: gap consuming left (remove);
    // y: gap consuming right (insert)
    let mut m = vec![NEG_INF; (s + 1) * cols];
    let mut x = vec![NEG_INF; (s + 1) * cols];
    let mut y = vec![NEG_INF; (s + 1) * cols];

    m[idx(0, 0)] = 0;
    for i in 1..=s {
        x[idx(i, 0)] = -GAP_OPEN - (i as i64 - 1) * GAP_EXTEND;
    }
    for j in 1..=t {
        y[idx(0, j)] = -GAP_OPEN - (j as i64 - 1) * GAP_EXTEND;
    }

    for i in 1..=s {
        for j in 1..=t {
            let score = token_score(&left[i - 1], &right[j - 1]);
            let best_prev = m[idx(i - 1, j - 1)]
                .max(x[idx(i - 1, j - 1)])
                .max(y[idx(i - 1, j - 1)]);
            m[idx(i, j)] = best_prev.saturating_add(score);

            x[idx(i, j)] = (x[idx(i - 1, j)] - GAP_EXTEND)
                .max(m[idx(i - 1, j)] - GAP_OPEN)
                .max(y[idx(i - 1, j)] - GAP_OPEN);

            y[idx(i, j)] = (y[idx(i, j - 1)] - GAP_EXTEND)
                .max(m[idx(i, j - 1)] - GAP_OPEN)
                .max(x[idx(i, j - 1)] - GAP_OPEN);
        }
    }

    // Traceback, preferring diagonal, then remove, then insert.
    let mut moves: Vec<Move> = Vec::with_capacity(s + t);
    let mut i = s;
    let mut j = t;
    let mut state = {
        let (mm, xx, yy) = (m[idx(s, t)], x[idx(s, t)], y[idx(s, t)]);
        if mm >= xx && mm >= yy {
            Move::Diag
        } else if xx >= yy {
            Move::Up
        } else {
            Move::Left
        }
    };

    while i > 0 || j > 0 {
        match state {
            Move::Diag if i > 0 && j > 0 => {
                let score = token_score(&left[i - 1], &right[j - 1]);
                let target = m[idx(i, j)] - score;
                moves.push(Move::Diag);
                state = if m[idx(i - 1, j - 1)] == target {
                    Move::Diag
                } else if x[idx(i - 1, j - 1)] == target {
                    Move::Up
                } else {
                    Move::Left
                };
                i -= 1;
                j -= 1;
            }
            Move::Up if i > 0 => {
                let target = x[idx(i, j)];
                moves.push(Move::Up);
                state = if x[idx(i - 1, j)] - GAP_EXTEND == target {
                    Move::Up
                } else if m[idx(i - 1, j)] - GAP_OPEN == target {
                    Move::Diag
                } else {
                    Move::Left
                };
                i -= 1;
            }
            Move::Left if j > 0 => {
                let target = y[idx(i, j)];
                moves.push(Move::Left);
                state = if y[idx(i, j - 1)] - GAP_EXTEND == target {
                    Move::Left
                } else if m[idx(i, j - 1)] - GAP_OPEN == target {
                    Move::Diag
                } else {
                    Move::Up
                };
                j -= 1;
            }
            // Exhausted one side; drain the other
            _ => {
                if i > 0 {
                    moves.push(Move::Up);
                    i -= 1;
                } else {
                    moves.push(Move::Left);
                    j -= 1;
                }
            }
        }
    }
    moves.reverse();

    // Replay forward, emitting coalesced spans.
    let mut li = offset;
    let mut ri = offset;
    for mv in moves {
        match mv {
            Move::Diag => {
                let (l, r) = (&left[li - offset], &right[ri - offset]);
                if l == r {
                    push_span(ops, EditSpan::equal(li..li + 1, ri..ri + 1));
                } else {
                    push_span(ops, EditSpan::remove(li..li + 1, ri));
                    push_span(ops, EditSpan::insert(li + 1, ri..ri + 1));
                }
                li += 1;
                ri += 1;
            }
            Move::Up => {
                push_span(ops, EditSpan::remove(li..li + 1, ri));
                li += 1;
            }
            Move::Left => {
                push_span(ops, EditSpan::insert(li, ri..ri + 1));
                ri += 1;
            }
        }
    }
}

/// Append a span, merging with a trailing span of the same kind.
fn push_span(ops: &mut Vec<EditSpan>, span: EditSpan) {
    if let Some(last) = ops.last_mut()
        && last.kind == span.kind
        && last.left.end == span.left.start
        && last.right.end == span.right.start
    {
        last.left.end = span.left.end;
        last.right.end = span.right.end;
        return;
    }
    ops.push(span);
}

/// Merge single-space equal runs that sit between edits into both
/// neighbouring edits, and keep newline boundaries from gluing
/// unrelated edits together.
fn compress_edits(ops: Vec<EditSpan>, left: &[String], right: &[String]) -> Vec<EditSpan> {
    let mut out: Vec<EditSpan> = Vec::new();
    let mut pending_remove: Option<EditSpan> = None;
    let mut pending_insert: Option<EditSpan> = None;

    let count = ops.len();
    for (i, op) in ops.into_iter().enumerate() {
        match op.kind {
            SpanKind::Remove => {
                if left[op.left.start].starts_with('\n')
                    && let Some(pending) = pending_insert.take()
                {
                    out.push(pending);
                }
                match &mut pending_remove {
                    Some(p) => p.left.end = op.left.end,
                    None => pending_remove = Some(op),
                }
            }
            SpanKind::Insert => {
                if right[op.right.start].starts_with('\n')
                    && let Some(pending) = pending_remove.take()
                {
                    out.push(pending);
                }
                match &mut pending_insert {
                    Some(p) => p.right.end = op.right.end,
                    None => pending_insert = Some(op),
                }
            }
            SpanKind::Equal => {
                let single_space = op.left.len() == 1
                    && (left[op.left.start] == " " || left[op.left.start] == "\u{a0}");
                let between_edits = i + 1 < count
                    && (pending_remove.is_some() || pending_insert.is_some());

                if single_space && between_edits {
                    // Absorb the lone space into both sides of the edit
                    match &mut pending_remove {
                        Some(p) => p.left.end = op.left.end,
                        None => {
                            pending_remove =
                                Some(EditSpan::remove(op.left.clone(), op.right.start));
                        }
                    }
                    match &mut pending_insert {
                        Some(p) => p.right.end = op.right.end,
                        None => pending_insert = Some(EditSpan::insert(op.left.end, op.right)),
                    }
                } else {
                    if let Some(pending) = pending_remove.take() {
                        out.push(pending);
                    }
                    if let Some(pending) = pending_insert.take() {
                        out.push(pending);
                    }
                    out.push(op);
                }
            }
        }
    }

    if let Some(pending) = pending_remove.take() {
        out.push(pending);
    }
    if let Some(pending) = pending_insert.take() {
        out.push(pending);
    }

    out
}
