mod upstream;

use std::sync::Arc;

use anyhow::Context as _;
use chrono::{Datelike, Local, Timelike};
use homeblocker_lib::{header_only_reply, DnsQuery, QueryType, ResponseCode};
use homeblocker_rules::BlockRegistry;
pub(crate) use upstream::forward_to_upstream;

use crate::{Connection, State};

/// What to do with a decoded query
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict<'r> {
    /// Reply with an empty authoritative answer, naming the block responsible
    Block(&'r str),
    Forward,
}

/// Only standard `A` queries with a single question are subject to blocking, everything else is forwarded.
pub fn triage<'r, T: Datelike + Timelike>(query: &DnsQuery, registry: &'r BlockRegistry, now: &T) -> Verdict<'r> {
    query
        .single_question()
        .filter(|question| question.query_type == QueryType::A)
        .and_then(|question| registry.blocking_rule(&question.fqdn(), now))
        .map_or(Verdict::Forward, Verdict::Block)
}

pub async fn resolve_query(mut connection: Connection, query: Vec<u8>, state: Arc<State>) -> anyhow::Result<()> {
    let client = connection.get_client_addr().ok();

    let response = match DnsQuery::from_bytes(&query) {
        Err(e) => {
            tracing::debug!(client = ?client, "Malformed query: {:#}", e);
            match header_only_reply(&query, ResponseCode::FormatError) {
                Ok(response) => response,
                // Not even a header, nothing to reply to
                Err(_) => return Ok(()),
            }
        }
        Ok(parsed) => {
            if let Some(question) = parsed.questions.first() {
                tracing::debug!(
                    client = ?client,
                    qname = ?question.qname,
                    qtype = ?question.query_type,
                    "Resolving a query"
                );
            }

            match triage(&parsed, &state.registry, &Local::now()) {
                Verdict::Block(rule) => {
                    tracing::info!(client = ?client, qname = ?parsed.questions[0].qname, rule, "Blocked");
                    parsed
                        .empty_reply(ResponseCode::Success, true)
                        .context("error while encoding an empty response")?
                }
                Verdict::Forward => {
                    match forward_to_upstream(&query, state.upstream_resolver, connection.is_tcp()).await {
                        Ok(response) => response,
                        Err(e) => {
                            tracing::debug!(resolver = ?state.upstream_resolver, "Error while forwarding a request to the upstream resolver: {:#}", e);
                            parsed
                                .empty_reply(ResponseCode::ServerFailure, false)
                                .context("error while encoding a SERVFAIL response")?
                        }
                    }
                }
            }
        }
    };

    if let Err(e) = connection.send_encoded_packet(&response).await {
        // Do not propagate the error, as it's per-user and thus recoverable
        tracing::error!("Error while sending a DNS response: {:#}", e)
    };

    Ok(())
}
