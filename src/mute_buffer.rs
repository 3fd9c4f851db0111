use std::io::Write;

/// Formats a sequence of account ids as a Postgres array literal
/// (`{a,b,c}`) for the `= ANY($n)` mute query. Pure computation, built
/// fresh for each forward — not shared across bus instances.
pub struct MutePQBuffer {
    buf: Vec<u8>,
    wrote_any: bool,
}

impl MutePQBuffer {
    /// `expected_count` is a capacity hint, not a hard limit.
    pub fn with_capacity_hint(expected_count: usize) -> Self {
        let mut buf = Vec::with_capacity(expected_count * 8 + 2);
        buf.push(b'{');
        Self { buf, wrote_any: false }
    }

    pub fn write(&mut self, id: i64) {
        write!(self.buf, "{id}").expect("write to an in-memory buffer cannot fail");
        self.buf.push(b',');
        self.wrote_any = true;
    }

    pub fn finalize(mut self) -> String {
        if self.wrote_any {
            let last = self.buf.len() - 1;
            self.buf[last] = b'}';
        } else {
            self.buf.push(b'}');
        }
        String::from_utf8(self.buf).expect("buffer only ever contains ASCII")
    }
}

#[cfg(test)]
fn parse(literal: &str) -> Vec<i64> {
    let inner = literal.trim_start_matches('{').trim_end_matches('}');
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(',').map(|s| s.parse().unwrap()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_empty_buffer_yields_empty_braces() {
        let buf = MutePQBuffer::with_capacity_hint(0);
        assert_eq!(buf.finalize(), "{}");
    }

    #[test]
    fn finalize_single_id() {
        let mut buf = MutePQBuffer::with_capacity_hint(1);
        buf.write(42);
        assert_eq!(buf.finalize(), "{42}");
    }

    #[test]
    fn finalize_multiple_ids_overwrites_trailing_comma() {
        let mut buf = MutePQBuffer::with_capacity_hint(3);
        buf.write(1);
        buf.write(2);
        buf.write(3);
        assert_eq!(buf.finalize(), "{1,2,3}");
    }

    #[test]
    fn finalize_handles_negative_ids() {
        let mut buf = MutePQBuffer::with_capacity_hint(2);
        buf.write(-7);
        buf.write(9);
        assert_eq!(buf.finalize(), "{-7,9}");
    }

    #[test]
    fn format_is_a_left_inverse_of_parse() {
        let cases: Vec<Vec<i64>> = vec![
            vec![],
            vec![0],
            vec![1, 2, 3],
            vec![i64::MAX, i64::MIN, -1, 0, 1],
        ];
        for ids in cases {
            let mut buf = MutePQBuffer::with_capacity_hint(ids.len());
            for id in &ids {
                buf.write(*id);
            }
            let literal = buf.finalize();
            assert_eq!(parse(&literal), ids);
        }
    }
}
