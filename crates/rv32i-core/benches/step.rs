use criterion::{criterion_group, criterion_main, Criterion};
use rv32i_asm as asm;
use rv32i_asm::Gpr;
use rv32i_core::{Cpu, Memory, Registers};

fn criterion_benchmark(c: &mut Criterion) {
    // 100 ADDIs followed by a jump back to the start.
    let mut image = Vec::new();
    for _ in 0..100 {
        image.extend_from_slice(&asm::addi(Gpr::A0, Gpr::A0, 1).to_le_bytes());
    }
    image.extend_from_slice(&asm::jal(Gpr::ZERO, -400).to_le_bytes());

    c.bench_function("500 steps", |b| {
        b.iter(|| {
            let mut cpu = Cpu::new(Memory::new(4096), Registers::new());
            cpu.load_program(&image).unwrap();
            for _ in 0..500 {
                cpu.step().unwrap();
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
