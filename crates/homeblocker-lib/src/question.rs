use anyhow::Context;

use crate::{ByteBuf, EncodeToBuf, FromBuf, IN_CLASS};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QueryType {
    UNKNOWN(u16),
    A,
    NS,
    CNAME,
    AAAA,
    OPT,
    ANY,
}

impl From<u16> for QueryType {
    fn from(value: u16) -> Self {
        match value {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            28 => QueryType::AAAA,
            41 => QueryType::OPT,
            255 => QueryType::ANY,
            _ => QueryType::UNKNOWN(value),
        }
    }
}

impl From<QueryType> for u16 {
    fn from(val: QueryType) -> Self {
        match val {
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CNAME => 5,
            QueryType::AAAA => 28,
            QueryType::OPT => 41,
            QueryType::ANY => 255,
            QueryType::UNKNOWN(qtype) => qtype,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Question {
    /// Domain name without the trailing dot, as it appears on the wire
    pub qname: String,
    pub query_type: QueryType,
    pub qclass: u16,
}

impl Question {
    pub fn new(qname: impl Into<String>, query_type: QueryType, qclass: Option<u16>) -> Self {
        Self {
            qname: qname.into(),
            query_type,
            qclass: qclass.unwrap_or(IN_CLASS),
        }
    }

    /// Lowercase QNAME with the trailing label terminator, e.g. `www.example.com.`
    pub fn fqdn(&self) -> String {
        let mut fqdn = self.qname.trim_end_matches('.').to_ascii_lowercase();
        fqdn.push('.');
        fqdn
    }
}

impl FromBuf for Question {
    fn from_buf(buf: &mut ByteBuf) -> anyhow::Result<Question> {
        let qname = buf.read_qname().context("QNAME is missing")?;
        let qtype_raw = buf.read_u16().context("QTYPE is missing")?;
        let qclass = buf.read_u16().context("QCLASS is missing")?;

        Ok(Question {
            qname,
            query_type: qtype_raw.into(),
            qclass,
        })
    }
}

impl EncodeToBuf for Question {
    fn encode_to_buf(&self, buf: &mut ByteBuf) -> anyhow::Result<()> {
        buf.write_qname(&self.qname).context("writing QNAME")?;
        buf.write_u16(self.query_type.into());
        buf.write_u16(self.qclass);

        Ok(())
    }
}
