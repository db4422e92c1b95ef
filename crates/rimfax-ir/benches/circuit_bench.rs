//! Benchmarks for rimfax circuit operations
//!
//! Run with: cargo bench -p rimfax-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rimfax_ir::{Circuit, Location, Operation, PrimitiveGate};
use std::f64::consts::PI;

fn op1(gate: PrimitiveGate, qudit: usize, params: Vec<f64>) -> Operation {
    Operation::new(gate.into(), Location::new(vec![qudit]).unwrap(), params).unwrap()
}

fn op2(gate: PrimitiveGate, a: usize, b: usize) -> Operation {
    Operation::new(gate.into(), Location::new(vec![a, b]).unwrap(), vec![]).unwrap()
}

/// Benchmark appending operations with greedy scheduling
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    group.bench_function("h_gate", |b| {
        let mut circuit = Circuit::new(10);
        b.iter(|| {
            circuit.append(black_box(op1(PrimitiveGate::H, 0, vec![]))).unwrap();
        });
    });

    group.bench_function("rx_gate", |b| {
        let mut circuit = Circuit::new(10);
        b.iter(|| {
            circuit
                .append(black_box(op1(PrimitiveGate::Rx, 0, vec![PI / 4.0])))
                .unwrap();
        });
    });

    group.bench_function("cx_gate", |b| {
        let mut circuit = Circuit::new(10);
        b.iter(|| {
            circuit.append(black_box(op2(PrimitiveGate::CX, 0, 1))).unwrap();
        });
    });

    group.finish();
}

/// Benchmark building GHZ-style circuits of increasing width
fn bench_ghz_circuit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghz_circuit");

    for num_qudits in &[3, 5, 10, 20, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("create", num_qudits),
            num_qudits,
            |b, &n| {
                b.iter(|| {
                    let mut circuit = Circuit::new(n);
                    circuit.append(op1(PrimitiveGate::H, 0, vec![])).unwrap();
                    for i in 0..n - 1 {
                        circuit.append(op2(PrimitiveGate::CX, i, i + 1)).unwrap();
                    }
                    black_box(circuit)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark flat parameter extraction and rebinding
fn bench_flat_params(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_params");

    for num_qudits in &[5, 10, 20, 50] {
        let mut circuit = Circuit::new(*num_qudits);
        for _layer in 0..5 {
            for i in 0..*num_qudits {
                circuit
                    .append(op1(PrimitiveGate::Rz, i, vec![0.1 * i as f64]))
                    .unwrap();
            }
            for i in (0..*num_qudits - 1).step_by(2) {
                circuit.append(op2(PrimitiveGate::CX, i, i + 1)).unwrap();
            }
        }

        group.bench_with_input(
            BenchmarkId::new("extract", num_qudits),
            &circuit,
            |b, circuit| {
                b.iter(|| black_box(circuit.flat_params()));
            },
        );

        let params = circuit.flat_params();
        group.bench_with_input(
            BenchmarkId::new("rebind", num_qudits),
            &(circuit, params),
            |b, (circuit, params)| {
                b.iter(|| black_box(circuit.with_flat_params(params).unwrap()));
            },
        );
    }

    group.finish();
}

/// Benchmark dense unitary composition on small circuits
fn bench_unitary(c: &mut Criterion) {
    let mut group = c.benchmark_group("unitary");

    for num_qudits in &[2, 4, 6, 8] {
        let mut circuit = Circuit::new(*num_qudits);
        circuit.append(op1(PrimitiveGate::H, 0, vec![])).unwrap();
        for i in 0..*num_qudits - 1 {
            circuit.append(op2(PrimitiveGate::CX, i, i + 1)).unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("compose", num_qudits),
            &circuit,
            |b, circuit| {
                b.iter(|| black_box(circuit.unitary().unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_append,
    bench_ghz_circuit,
    bench_flat_params,
    bench_unitary,
);

criterion_main!(benches);
