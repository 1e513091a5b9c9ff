use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;
use std::time::Duration;

use pnet_packet::icmp::IcmpTypes;

use echoprobe::checksum::verify_checksum;
use echoprobe::packet::{encode_echo, ICMP_HEADER_LEN, TIMESTAMP_LEN};
use echoprobe::{PingOption, Pinger, ProbeError, ProbeSocket, Transport};

const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7));

/// Answers the requests whose position in `answers` is true, in order.
struct ScriptedTransport {
    answers: VecDeque<bool>,
    requests: Rc<RefCell<Vec<Vec<u8>>>>,
}

struct ScriptedSocket {
    answer: bool,
    reply: Option<Vec<u8>>,
    requests: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Transport for ScriptedTransport {
    type Socket = ScriptedSocket;

    fn open(&mut self) -> Result<ScriptedSocket, ProbeError> {
        Ok(ScriptedSocket {
            answer: self.answers.pop_front().unwrap_or(false),
            reply: None,
            requests: self.requests.clone(),
        })
    }
}

impl ProbeSocket for ScriptedSocket {
    fn send_to(&mut self, packet: &[u8], _destination: IpAddr) -> io::Result<usize> {
        self.requests.borrow_mut().push(packet.to_vec());
        if self.answer {
            let ident = u16::from_be_bytes([packet[4], packet[5]]);
            let seq = u16::from_be_bytes([packet[6], packet[7]]);

            let mut frame = vec![0x45, 0, 0, 0, 0, 0, 0, 0, 64, 1, 0, 0];
            frame.extend_from_slice(&[198, 51, 100, 7, 10, 0, 0, 1]);
            frame.extend_from_slice(&encode_echo(IcmpTypes::EchoReply, ident, seq, &packet[ICMP_HEADER_LEN..]));
            self.reply = Some(frame);
        }
        Ok(packet.len())
    }

    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(self.reply.is_some())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let frame = self.reply.take().unwrap_or_default();
        buf[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }
}

fn run(answers: &[bool], popt: PingOption) -> (echoprobe::PingReport, Vec<Vec<u8>>) {
    let requests = Rc::new(RefCell::new(Vec::new()));
    let transport = ScriptedTransport {
        answers: answers.iter().copied().collect(),
        requests: requests.clone(),
    };
    let mut pinger = Pinger::new(TARGET, popt, transport).unwrap();
    let report = pinger.run(answers.len()).unwrap();
    let sent = requests.borrow().clone();
    (report, sent)
}

fn popt() -> PingOption {
    PingOption {
        timeout: Duration::from_secs(5),
        ident: Some(0x0bad),
        ..Default::default()
    }
}

#[test]
fn lossy_run_counts_every_attempt() {
    let (report, _) = run(&[true, false, true, false, false], popt());

    assert!(!report.timed_out);
    assert_eq!(report.sent, 5);
    assert_eq!(report.received, 2);
    assert_eq!(report.dropped, 3);
    assert!(report.min_rtt.unwrap() <= report.max_rtt.unwrap());
    assert!((report.loss_rate() - 0.6).abs() < 1e-9);
}

#[test]
fn requests_are_well_formed() {
    let popt = PingOption { len: 100, ..popt() };
    let (_, sent) = run(&[true, true, true], popt);

    assert_eq!(sent.len(), 3);
    for (seq, packet) in sent.iter().enumerate() {
        assert_eq!(packet.len(), ICMP_HEADER_LEN + 100);
        assert_eq!(packet[0], 8);
        assert_eq!(packet[1], 0);
        assert_eq!(u16::from_be_bytes([packet[4], packet[5]]), 0x0bad);
        assert_eq!(u16::from_be_bytes([packet[6], packet[7]]), seq as u16);
        assert!(verify_checksum(packet));

        let mut ts = [0u8; TIMESTAMP_LEN];
        ts.copy_from_slice(&packet[ICMP_HEADER_LEN..ICMP_HEADER_LEN + TIMESTAMP_LEN]);
        assert!(f64::from_be_bytes(ts) > 0.0);
    }
}

#[test]
fn report_text_for_completed_run() {
    let (report, _) = run(&[true, true, true], popt());
    let text = report.to_string();

    assert!(text.contains("Pings Sent:\t3"));
    assert!(text.contains("Pings Received:\t3"));
    assert!(text.contains("Pings Dropped:\t0"));
    assert!(text.contains("Average Time:\t"));
    assert!(!text.contains("no statistics available"));
}
