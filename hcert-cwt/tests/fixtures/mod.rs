// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared CWT fixture encoding for the hcert-cwt tests.

use minicbor::Encoder;

pub struct VaccinationFixture {
    pub dose_number: u32,
    pub total_series_doses: u32,
}

pub struct TokenParams {
    pub issuer: &'static str,
    pub issued_at: Option<i64>,
    pub expires_at: i64,
    pub certificate: Option<VaccinationFixture>,
}

pub fn vaccination_cert_map(dose_number: u32, total_series_doses: u32) -> VaccinationFixture {
    VaccinationFixture {
        dose_number,
        total_series_doses,
    }
}

pub fn encode_token(params: &TokenParams) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);

    let mut entries = 2u64;
    if params.issued_at.is_some() {
        entries += 1;
    }
    if params.certificate.is_some() {
        entries += 1;
    }

    enc.map(entries).unwrap();
    enc.i64(1).unwrap();
    enc.str(params.issuer).unwrap();
    enc.i64(4).unwrap();
    enc.i64(params.expires_at).unwrap();
    if let Some(iat) = params.issued_at {
        enc.i64(6).unwrap();
        enc.i64(iat).unwrap();
    }
    if let Some(cert) = &params.certificate {
        enc.i64(-260).unwrap();
        enc.map(1).unwrap();
        enc.i64(1).unwrap();
        encode_cert_map(&mut enc, cert);
    }

    out
}

pub fn encode_cert_map(enc: &mut Encoder<&mut Vec<u8>>, cert: &VaccinationFixture) {
    enc.map(4).unwrap();

    enc.str("ver").unwrap();
    enc.str("1.3.0").unwrap();

    enc.str("nam").unwrap();
    enc.map(4).unwrap();
    enc.str("fn").unwrap();
    enc.str("Musterfrau").unwrap();
    enc.str("fnt").unwrap();
    enc.str("MUSTERFRAU").unwrap();
    enc.str("gn").unwrap();
    enc.str("Erika").unwrap();
    enc.str("gnt").unwrap();
    enc.str("ERIKA").unwrap();

    enc.str("dob").unwrap();
    enc.str("1979-04-14").unwrap();

    enc.str("v").unwrap();
    enc.array(1).unwrap();
    enc.map(10).unwrap();
    enc.str("tg").unwrap();
    enc.str("840539006").unwrap();
    enc.str("vp").unwrap();
    enc.str("1119349007").unwrap();
    enc.str("mp").unwrap();
    enc.str("EU/1/20/1528").unwrap();
    enc.str("ma").unwrap();
    enc.str("ORG-100030215").unwrap();
    enc.str("dn").unwrap();
    enc.u32(cert.dose_number).unwrap();
    enc.str("sd").unwrap();
    enc.u32(cert.total_series_doses).unwrap();
    enc.str("dt").unwrap();
    enc.str("2021-06-01").unwrap();
    enc.str("co").unwrap();
    enc.str("DE").unwrap();
    enc.str("is").unwrap();
    enc.str("Robert Koch-Institut").unwrap();
    enc.str("ci").unwrap();
    enc.str("URN:UVCI:01:DE:TEST#X").unwrap();
}
