//! A minimal DNS wire codec: just enough to triage a query and to synthesize an empty reply.
//! Everything past the question section is left untouched, forwarded queries are relayed as raw bytes.

#[cfg(test)]
pub(crate) mod test_utils;

mod buf;
mod dns_header;
mod question;

pub use buf::{ByteBuf, EncodeToBuf, FromBuf};
pub use dns_header::{DnsHeader, QueryOpcode, ResponseCode, DNS_HEADER_SIZE};
pub use question::{QueryType, Question};

use anyhow::Context;

/// Internet class
pub const IN_CLASS: u16 = 1;

/// Header and question section of a DNS message.
#[derive(Debug, PartialEq, Eq, Default, Clone)]
pub struct DnsQuery {
    pub header: DnsHeader,
    pub questions: Vec<Question>,
}

impl DnsQuery {
    pub fn new(header: DnsHeader, questions: Vec<Question>) -> Self {
        DnsQuery { header, questions }
    }

    /// Decodes the header and the question section, ignoring the remaining sections.
    pub fn from_bytes(src: &[u8]) -> anyhow::Result<DnsQuery> {
        let mut buf = ByteBuf::new(&src);
        let header = DnsHeader::from_buf(&mut buf).context("header parsing error")?;

        let questions = (0..header.question_count)
            .map(|idx| Question::from_buf(&mut buf).with_context(|| format!("question parsing error at idx {}", idx)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(DnsQuery { header, questions })
    }

    /// The only question of a standard query, if that's what this message is.
    pub fn single_question(&self) -> Option<&Question> {
        match self.questions.as_slice() {
            [question] if !self.header.is_response && self.header.opcode == QueryOpcode::QUERY => Some(question),
            _ => None,
        }
    }

    /// Encodes a reply without any records that echoes the questions of this query.
    pub fn empty_reply(&self, response_code: ResponseCode, authoritative: bool) -> anyhow::Result<Vec<u8>> {
        let mut header = self.header.to_response(response_code);
        header.is_authoritative = authoritative;
        header.question_count = self.questions.len() as u16;

        let mut buf = ByteBuf::new_empty(None);
        header.encode_to_buf(&mut buf).context("writing header")?;
        self.questions
            .iter()
            .enumerate()
            .try_for_each(|(idx, question)| {
                question
                    .encode_to_buf(&mut buf)
                    .with_context(|| format!("writing question at idx {}", idx))
            })?;

        Ok(buf.into_vec())
    }
}

/// Encodes a header-only reply to a message whose question section couldn't be decoded.
pub fn header_only_reply(src: &[u8], response_code: ResponseCode) -> anyhow::Result<Vec<u8>> {
    let mut buf = ByteBuf::new(&src);
    let header = DnsHeader::from_buf(&mut buf).context("header parsing error")?;

    let mut dst = ByteBuf::new_empty(Some(DNS_HEADER_SIZE));
    header.to_response(response_code).encode_to_buf(&mut dst)?;
    Ok(dst.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A query for `example.com` A with RD set and an OPT RR in the additional section
    const QUERY: &[u8] = &[
        0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, //
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, 0x00, 0x01, 0x00, 0x01, //
        0x00, 0x00, 0x29, 0x04, 0xd0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn decode_query() {
        let query = DnsQuery::from_bytes(QUERY).expect("shouldn't have failed");
        assert_eq!(query.header.id, 0x1234);
        assert!(query.header.recursion_desired);
        assert_eq!(query.header.additional_rr_count, 1);
        assert_eq!(query.questions, [Question::new("example.com", QueryType::A, None)]);
        assert_eq!(query.single_question().map(Question::fqdn).as_deref(), Some("example.com."));
    }

    #[test]
    fn decode_query_with_missing_question() {
        let err = DnsQuery::from_bytes(&QUERY[..20]).unwrap_err();
        assert_eq!(err.to_string(), "question parsing error at idx 0");
    }

    #[test]
    fn single_question_only_for_standard_queries() {
        let mut query = DnsQuery::from_bytes(QUERY).unwrap();
        query.header.opcode = QueryOpcode::STATUS;
        assert!(query.single_question().is_none());

        let mut query = DnsQuery::from_bytes(QUERY).unwrap();
        query.questions.push(Question::new("example.org", QueryType::A, None));
        assert!(query.single_question().is_none());

        let mut query = DnsQuery::from_bytes(QUERY).unwrap();
        query.header.is_response = true;
        assert!(query.single_question().is_none());
    }

    #[test]
    fn empty_authoritative_reply() {
        let query = DnsQuery::from_bytes(QUERY).unwrap();
        let reply = query.empty_reply(ResponseCode::Success, true).expect("shouldn't have failed");

        let decoded = DnsQuery::from_bytes(&reply).expect("reply should be decodable");
        assert_eq!(decoded.header.id, 0x1234);
        assert!(decoded.header.is_response);
        assert!(decoded.header.is_authoritative);
        assert!(decoded.header.recursion_desired);
        assert_eq!(decoded.header.response_code, ResponseCode::Success);
        assert_eq!(decoded.header.answer_rr_count, 0);
        assert_eq!(decoded.header.additional_rr_count, 0);
        assert_eq!(decoded.questions, query.questions);
        // Header + question, the OPT RR isn't echoed
        assert_eq!(reply.len(), QUERY.len() - 11);
    }

    #[test]
    fn header_only_format_error() {
        let reply = header_only_reply(&QUERY[..14], ResponseCode::FormatError).expect("shouldn't have failed");
        assert_eq!(reply.len(), DNS_HEADER_SIZE);
        let decoded = DnsQuery::from_bytes(&reply).unwrap();
        assert_eq!(decoded.header.id, 0x1234);
        assert_eq!(decoded.header.response_code, ResponseCode::FormatError);
        assert!(decoded.questions.is_empty());
    }

    #[test]
    fn header_only_reply_needs_a_header() {
        assert!(header_only_reply(&QUERY[..5], ResponseCode::FormatError).is_err());
    }
}
