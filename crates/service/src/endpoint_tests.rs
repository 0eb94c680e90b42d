// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dt_wire::{RequestHeader, FILE_HEADER_LEN, REQUEST_HEADER_LEN, TRANSCRIPT_OVERHEAD};

fn ok_request(len: usize) -> Vec<u8> {
    // challenge verdict byte 0x00 (ok) followed by payload
    let mut raw = vec![0x00];
    raw.extend(std::iter::repeat(0xA5).take(len - 1));
    raw
}

fn v1_status(install: u8) -> VdmTokenStatus {
    let mut bytes = [0u8; 10];
    bytes[0] = install;
    bytes[9] = 0x01;
    VdmTokenStatus::from_v1_bytes(&bytes)
}

#[test]
fn new_endpoints_start_clean() {
    let nsm = Endpoint::nsm("/xyz/openbmc_project/debug_token/GPU0");
    assert_eq!(nsm.kind(), EndpointKind::Nsm);
    assert_eq!(nsm.state(), EndpointState::None);
    assert_eq!(nsm.eid(), None);
    assert_eq!(nsm.object(), "/xyz/openbmc_project/debug_token/GPU0");
    assert!(nsm.request().is_empty());
    assert!(nsm.status_json().is_none());

    let spdm = Endpoint::spdm(12, "/xyz/openbmc_project/SPDM/device0");
    assert_eq!(spdm.kind(), EndpointKind::Spdm);
    assert_eq!(spdm.eid(), Some(12));
}

#[test]
fn nsm_ok_request_is_transcript_and_header_wrapped() {
    let mut endpoint = Endpoint::nsm("/dt/GPU0");
    let raw = ok_request(40);
    endpoint.set_request(&raw).expect("set_request failed");

    assert_eq!(endpoint.state(), EndpointState::RequestAcquired);
    let request = endpoint.request();
    assert_eq!(request.len(), REQUEST_HEADER_LEN + raw.len() + TRANSCRIPT_OVERHEAD);
    let header = RequestHeader::parse(request).expect("header");
    assert_eq!(header.size as usize, request.len());
    // the raw request is embedded at the transcript payload offset
    let payload_offset = REQUEST_HEADER_LEN + 52;
    assert_eq!(&request[payload_offset..payload_offset + raw.len()], raw.as_slice());
}

#[test]
fn nsm_request_verdicts_map_to_states() {
    let mut endpoint = Endpoint::nsm("/dt/GPU0");
    endpoint.set_request(&[0x01, 0xFF]).expect("set_request failed");
    assert_eq!(endpoint.state(), EndpointState::TokenInstalled);
    assert!(endpoint.request().is_empty(), "non-ok verdicts must not encode");

    let mut endpoint = Endpoint::nsm("/dt/GPU0");
    endpoint.set_request(&[0x02, 0xFF]).expect("set_request failed");
    assert_eq!(endpoint.state(), EndpointState::Unsupported);

    let mut endpoint = Endpoint::nsm("/dt/GPU0");
    endpoint.set_request(&[0x77, 0xFF]).expect("set_request failed");
    assert_eq!(endpoint.state(), EndpointState::Error);

    let mut endpoint = Endpoint::nsm("/dt/GPU0");
    endpoint.set_request(&[]).expect("set_request failed");
    assert_eq!(endpoint.state(), EndpointState::Error);
}

#[test]
fn spdm_request_is_header_wrapped_only() {
    let mut endpoint = Endpoint::spdm(7, "/dt/spdm0");
    let raw = vec![0x10, 0x20, 0x30];
    endpoint.set_request(&raw).expect("set_request failed");

    assert_eq!(endpoint.state(), EndpointState::RequestAcquired);
    assert_eq!(endpoint.request().len(), REQUEST_HEADER_LEN + raw.len());
    assert_eq!(&endpoint.request()[REQUEST_HEADER_LEN..], raw.as_slice());
}

#[test]
fn parked_endpoint_ignores_requests() {
    let mut endpoint = Endpoint::spdm(7, "/dt/spdm0");
    endpoint.set_error();
    endpoint.set_request(&[1, 2, 3]).expect("set_request failed");
    assert_eq!(endpoint.state(), EndpointState::Error);
    assert!(endpoint.request().is_empty(), "a parked endpoint must not mutate");
}

#[test]
fn fresh_status_query_resets_parked_endpoint() {
    let mut endpoint = Endpoint::spdm(7, "/dt/spdm0");
    endpoint.set_error();
    endpoint.set_vdm_status(Ok(v1_status(0x00)));
    assert_eq!(endpoint.state(), EndpointState::StatusAcquired);
}

#[test]
fn vdm_status_outcomes_map_to_states() {
    let mut endpoint = Endpoint::spdm(7, "/dt/spdm0");
    endpoint.set_vdm_status(Ok(v1_status(0x01)));
    assert_eq!(endpoint.state(), EndpointState::TokenInstalled);
    let json = endpoint.status_json().expect("status json");
    assert_eq!(json["TokenInstalled"], true);
    assert_eq!(json["FirmwareFuseType"], "Debug");

    endpoint.set_vdm_status(Ok(v1_status(0x55)));
    assert_eq!(endpoint.state(), EndpointState::Error);

    endpoint.set_vdm_status(Err(StatusError::Unsupported));
    assert_eq!(endpoint.state(), EndpointState::Unsupported);
    assert!(endpoint.status_json().is_none(), "failed decode clears the stored status");

    endpoint.set_vdm_status(Err(StatusError::Device { code: 0x10 }));
    assert_eq!(endpoint.state(), EndpointState::Error);
}

#[test]
fn nsm_status_strings_map_to_states() {
    let status = |s: &str| NsmTokenStatus::from_dbus("DebugFw", s, "None", 0);

    let mut endpoint = Endpoint::nsm("/dt/GPU0");
    endpoint.set_nsm_status(status("StatusAcquired"));
    assert_eq!(endpoint.state(), EndpointState::StatusAcquired);

    endpoint.set_nsm_status(status("DebugSessionActive"));
    assert_eq!(endpoint.state(), EndpointState::TokenInstalled);

    endpoint.set_nsm_status(status("QueryFailure"));
    assert_eq!(endpoint.state(), EndpointState::Error);

    // a later good query resets the parked endpoint
    endpoint.set_nsm_status(status("StatusAcquired"));
    assert_eq!(endpoint.state(), EndpointState::StatusAcquired);
    assert!(endpoint.status_json().is_some());
}

#[test]
fn mismatched_status_setters_are_ignored() {
    let mut nsm = Endpoint::nsm("/dt/GPU0");
    nsm.set_vdm_status(Ok(v1_status(0x00)));
    assert_eq!(nsm.state(), EndpointState::None);

    let mut spdm = Endpoint::spdm(7, "/dt/spdm0");
    spdm.set_nsm_status(NsmTokenStatus::from_dbus("DebugFw", "StatusAcquired", "None", 0));
    assert_eq!(spdm.state(), EndpointState::None);
}

#[test]
fn status_output_routes_by_eid() {
    let mut endpoints = vec![
        Endpoint::spdm(1, "/dt/spdm1"),
        Endpoint::spdm(2, "/dt/spdm2"),
        Endpoint::spdm(3, "/dt/spdm3"),
        Endpoint::nsm("/dt/GPU0"),
    ];
    let good = "00 01 02 03 04 05 06 07 00 01 01 02 03 04 05 06 07 08 01";
    let unsupported = "00 01 02 03 04 05 06 07 05";
    let output = format!("1;1;tx;{good}\n2;1;tx;{unsupported}");

    apply_status_output(&mut endpoints, &output);
    assert_eq!(endpoints[0].state(), EndpointState::TokenInstalled);
    assert_eq!(endpoints[1].state(), EndpointState::Unsupported);
    // no line at all for EID 3
    assert_eq!(endpoints[2].state(), EndpointState::Error);
    // NSM endpoints are untouched by the VDM batch
    assert_eq!(endpoints[3].state(), EndpointState::None);
}

#[test]
fn request_file_collects_only_acquired_requests() {
    let mut ready = Endpoint::spdm(1, "/dt/spdm1");
    ready.set_request(&[0xAA, 0xBB]).expect("set_request failed");
    let mut parked = Endpoint::spdm(2, "/dt/spdm2");
    parked.set_error();
    let idle = Endpoint::spdm(3, "/dt/spdm3");

    let endpoints = vec![ready, parked, idle];
    let file = collect_request_file(&endpoints).expect("build failed");
    let header = dt_wire::FileHeader::parse(&file).expect("file header");
    assert_eq!(header.number_of_records, 1);
    assert_eq!(header.file_size as usize, file.len());
    assert_eq!(file.len(), FILE_HEADER_LEN + REQUEST_HEADER_LEN + 2);
}
