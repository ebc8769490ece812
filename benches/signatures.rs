//! Benchmarks for signature parsing.
//!
//! Covers the signature shapes found in Windows API metadata:
//! - Import signatures (primitives, pointers, value types)
//! - Field signatures (primitives, nested pointers, fixed-size arrays)
//! - Function pointer and type specification signatures

extern crate winmdgen;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use winmdgen::metadata::signatures::{
    parse_field_signature, parse_method_signature, parse_type_spec_signature,
};

/// Benchmark parsing a `void f()` import.
fn bench_method_signature_void_no_params(c: &mut Criterion) {
    // DEFAULT, 0 params, VOID return
    let signature = [0x00, 0x00, 0x01];

    c.bench_function("sig_method_void_no_params", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing `BOOL f(HANDLE h, void* buffer, uint size, uint* read, OVERLAPPED* o)`.
fn bench_method_signature_import(c: &mut Criterion) {
    // DEFAULT, 5 params, VALUETYPE BOOL return, VALUETYPE HANDLE, PTR VOID, U4, PTR U4,
    // PTR VALUETYPE OVERLAPPED
    let signature = [
        0x00, 0x05, 0x11, 0x09, 0x11, 0x0D, 0x0F, 0x01, 0x09, 0x0F, 0x09, 0x0F, 0x11, 0x11,
    ];

    c.bench_function("sig_method_import", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing an import with many parameters.
fn bench_method_signature_many_params(c: &mut Criterion) {
    // DEFAULT, 12 params, I4 return, repeating I4, PTR U2 and I
    let mut signature = vec![0x00, 0x0C, 0x08];
    for _ in 0..4 {
        signature.extend_from_slice(&[0x08, 0x0F, 0x07, 0x18]);
    }

    c.bench_function("sig_method_many_params", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a primitive field.
fn bench_field_signature_primitive(c: &mut Criterion) {
    // FIELD, U4
    let signature = [0x06, 0x09];

    c.bench_function("sig_field_primitive", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a double pointer field.
fn bench_field_signature_pointer(c: &mut Criterion) {
    // FIELD, PTR PTR U2
    let signature = [0x06, 0x0F, 0x0F, 0x07];

    c.bench_function("sig_field_pointer", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a fixed-size array field, `char16 szName[260]`.
fn bench_field_signature_fixed_array(c: &mut Criterion) {
    // FIELD, ARRAY CHAR rank 1, 1 size (260), 1 lower bound (0)
    let signature = [0x06, 0x14, 0x03, 0x01, 0x01, 0x81, 0x04, 0x01, 0x00];

    c.bench_function("sig_field_fixed_array", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a function pointer type specification.
fn bench_type_spec_fnptr(c: &mut Criterion) {
    // FNPTR, STDCALL, 2 params, I4 return, I, PTR VOID
    let signature = [0x1B, 0x02, 0x02, 0x08, 0x18, 0x0F, 0x01];

    c.bench_function("sig_type_spec_fnptr", |b| {
        b.iter(|| {
            let sig = parse_type_spec_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

criterion_group!(
    benches,
    bench_method_signature_void_no_params,
    bench_method_signature_import,
    bench_method_signature_many_params,
    bench_field_signature_primitive,
    bench_field_signature_pointer,
    bench_field_signature_fixed_array,
    bench_type_spec_fnptr,
);
criterion_main!(benches);
