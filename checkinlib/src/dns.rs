//! DNS answerer that resolves every name to the device, so any URL typed on a client
//! lands on the board page.

use core::net::Ipv4Addr;

pub const SERVER_PORT: u16 = 53;
pub const TTL_SECS: u32 = 60;

const HEADER_LEN: usize = 12;
const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;
/// Answer record: name pointer, type, class, TTL, data length and an IPv4 address.
const ANSWER_LEN: usize = 16;

/// The single question of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    /// Length of the encoded name plus type and class
    pub len: usize,
    pub qtype: u16,
    pub qclass: u16,
}

/// Parse the question of a standard query with exactly one question.
pub fn parse_question(query: &[u8]) -> Option<Question> {
    let header = query.get(..HEADER_LEN)?;
    let is_response = header[2] & 0x80 != 0;
    let opcode = (header[2] >> 3) & 0x0F;
    let questions = u16::from_be_bytes([header[4], header[5]]);
    if is_response || opcode != 0 || questions != 1 {
        return None;
    }

    let mut idx = HEADER_LEN;
    loop {
        let label_len = *query.get(idx)? as usize;
        idx += 1;
        if label_len == 0 {
            break;
        }
        // Compression pointers never occur in a question
        if label_len & 0xC0 != 0 {
            return None;
        }
        idx += label_len;
    }
    let fields = query.get(idx..idx + 4)?;

    Some(Question {
        len: idx + 4 - HEADER_LEN,
        qtype: u16::from_be_bytes([fields[0], fields[1]]),
        qclass: u16::from_be_bytes([fields[2], fields[3]]),
    })
}

/// Write the reply to `query` into `reply`, answering A questions with `address`.
/// Other question types get an empty answer. Returns the reply length.
pub fn answer(query: &[u8], address: Ipv4Addr, reply: &mut [u8]) -> Option<usize> {
    let question = parse_question(query)?;
    let question_end = HEADER_LEN + question.len;
    let answers = question.qtype == TYPE_A && question.qclass == CLASS_IN;
    let reply_len = question_end + if answers { ANSWER_LEN } else { 0 };
    let reply = reply.get_mut(..reply_len)?;

    reply.fill(0);
    reply[0..2].copy_from_slice(&query[0..2]);
    // Response, authoritative, recursion desired copied from the query
    reply[2] = 0x84 | (query[2] & 0x01);
    reply[3] = 0x80;
    reply[4..6].copy_from_slice(&1u16.to_be_bytes());
    reply[6..8].copy_from_slice(&(answers as u16).to_be_bytes());
    reply[HEADER_LEN..question_end].copy_from_slice(&query[HEADER_LEN..question_end]);

    if answers {
        let record = &mut reply[question_end..];
        // Pointer to the name in the question
        record[0] = 0xC0;
        record[1] = HEADER_LEN as u8;
        record[2..4].copy_from_slice(&TYPE_A.to_be_bytes());
        record[4..6].copy_from_slice(&CLASS_IN.to_be_bytes());
        record[6..10].copy_from_slice(&TTL_SECS.to_be_bytes());
        record[10..12].copy_from_slice(&4u16.to_be_bytes());
        record[12..16].copy_from_slice(&address.octets());
    }

    Some(reply_len)
}
