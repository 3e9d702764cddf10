//! Execution-trace construction: gates, public inputs and copy constraints go
//! in, polynomial columns and keys come out.
//!
//! Row layout: row 0 is an all-zero row, rows `1..=m` carry the `m` public
//! inputs, gate rows follow, and the table is padded with zero rows to a power
//! of two. A public input occupies both `w_l` and `w_r` of its row, and its
//! copy cycle is broken at the `w_l` cell: that cell's sigma value is moved
//! outside the id range, to `-(row + 1)`, leaving exactly the factors of the
//! public-input delta behind when the grand product telescopes.
//!
//! Identities are `id_j(row) = (j-1)·n + row`; sigma columns start as the
//! identity and each variable's cells are then linked into a cycle, so the
//! permutation argument forces all of them to share one value.
use crate::{
  errors::PipelineError,
  flavor::Flavor,
  key::VerificationKey,
  polys::multilinear::MultilinearPolynomial,
  prover::ProvingKey,
  provider::NativeContext,
  srs::KzgSrs,
  start_span,
};
use core::marker::PhantomData;
use ff::Field;
use halo2curves::bn256::Fr;
use std::time::Instant;
use tracing::{info, info_span};

/// Row index at which the public-input block starts (one zero row precedes it).
const PUB_INPUTS_OFFSET: usize = 1;

struct Gate {
  wires: [usize; 4],
  // q_m, q_l, q_r, q_o, q_4, q_c
  selectors: [Fr; 6],
}

/// Accumulates a circuit as variables, gates and calldata, then lays it out
/// as the polynomial columns of one execution trace.
pub struct TraceBuilder<F: Flavor> {
  variables: Vec<Fr>,
  public_inputs: Vec<usize>,
  gates: Vec<Gate>,
  calldata: Vec<Fr>,
  calldata_reads: Vec<usize>,
  _flavor: PhantomData<F>,
}

impl<F: Flavor> TraceBuilder<F> {
  /// An empty builder holding only the constant-zero variable.
  pub fn new() -> Self {
    Self {
      variables: vec![Fr::ZERO],
      public_inputs: Vec::new(),
      gates: Vec::new(),
      calldata: Vec::new(),
      calldata_reads: Vec::new(),
      _flavor: PhantomData,
    }
  }

  /// The index of the constant-zero variable, present in every trace.
  pub fn zero_idx(&self) -> usize {
    0
  }

  /// Allocates a witness variable, returning its index.
  pub fn add_variable(&mut self, value: Fr) -> usize {
    self.variables.push(value);
    self.variables.len() - 1
  }

  /// Allocates a variable exposed as a public input.
  pub fn add_public_input(&mut self, value: Fr) -> usize {
    let index = self.add_variable(value);
    self.public_inputs.push(index);
    index
  }

  /// Adds the gate `q_m·a·b + q_l·a + q_r·b + q_o·c + q_c = 0` over three
  /// wires; the fourth wire of the row is the zero variable.
  #[allow(clippy::too_many_arguments)]
  pub fn create_poly_gate(
    &mut self,
    a: usize,
    b: usize,
    c: usize,
    q_m: Fr,
    q_l: Fr,
    q_r: Fr,
    q_o: Fr,
    q_c: Fr,
  ) {
    self.gates.push(Gate {
      wires: [a, b, c, 0],
      selectors: [q_m, q_l, q_r, q_o, Fr::ZERO, q_c],
    });
  }

  /// Adds the four-wire gate `q_l·a + q_r·b + q_o·c + q_4·d + q_c = 0`.
  #[allow(clippy::too_many_arguments)]
  pub fn create_big_add_gate(
    &mut self,
    a: usize,
    b: usize,
    c: usize,
    d: usize,
    q_l: Fr,
    q_r: Fr,
    q_o: Fr,
    q_4: Fr,
    q_c: Fr,
  ) {
    self.gates.push(Gate {
      wires: [a, b, c, d],
      selectors: [Fr::ZERO, q_l, q_r, q_o, q_4, q_c],
    });
  }

  /// Installs the calldata column, replacing any previous contents.
  pub fn set_calldata(&mut self, values: Vec<Fr>) {
    self.calldata = values;
    self.calldata_reads.clear();
  }

  /// Records a read of `calldata[index]`, marking its read tag, and returns a
  /// fresh variable carrying the read value.
  pub fn read_calldata(&mut self, index: usize) -> Result<usize, PipelineError> {
    if index >= self.calldata.len() {
      return Err(PipelineError::InvalidInputLength);
    }
    self.calldata_reads.push(index);
    Ok(self.add_variable(self.calldata[index]))
  }

  /// Number of gates added so far.
  pub fn num_gates(&self) -> usize {
    self.gates.len()
  }

  /// Checks every gate against the witness values.
  pub fn is_satisfied(&self) -> Result<(), PipelineError> {
    for (i, gate) in self.gates.iter().enumerate() {
      let [a, b, c, d] = gate.wires.map(|w| self.variables[w]);
      let [q_m, q_l, q_r, q_o, q_4, q_c] = gate.selectors;
      if q_m * a * b + q_l * a + q_r * b + q_o * c + q_4 * d + q_c != Fr::ZERO {
        return Err(PipelineError::UnSat {
          reason: format!("gate {i} is not satisfied by its witness"),
        });
      }
    }
    Ok(())
  }

  /// Lays the circuit out as a trace, committing the precomputed columns
  /// against `srs` to form the keys.
  pub fn finalize(
    self,
    srs: &KzgSrs,
  ) -> Result<(ProvingKey<F>, VerificationKey<NativeContext>), PipelineError> {
    let (_trace_span, trace_t) = start_span!("trace_finalize", gates = self.gates.len());
    self.is_satisfied()?;
    if F::NUM_AUX == 0 && !self.calldata.is_empty() {
      return Err(PipelineError::InvalidInputLength);
    }

    let m = self.public_inputs.len();
    let used_rows = PUB_INPUTS_OFFSET + m + self.gates.len();
    let n = used_rows.max(self.calldata.len()).max(2).next_power_of_two();

    // wire indices per used row: the zero row, the public-input block, gates
    let mut rows: Vec<[usize; 4]> = Vec::with_capacity(used_rows);
    rows.push([0; 4]);
    for &v in &self.public_inputs {
      rows.push([v, v, 0, 0]);
    }
    for gate in &self.gates {
      rows.push(gate.wires);
    }

    let mut wires = vec![vec![Fr::ZERO; n]; 4];
    for (r, row) in rows.iter().enumerate() {
      for (c, &v) in row.iter().enumerate() {
        wires[c][r] = self.variables[v];
      }
    }

    let mut selectors = vec![vec![Fr::ZERO; n]; 6];
    for (g, gate) in self.gates.iter().enumerate() {
      let r = PUB_INPUTS_OFFSET + m + g;
      for (col, &q) in selectors.iter_mut().zip(gate.selectors.iter()) {
        col[r] = q;
      }
    }

    // identity and sigma columns; cells outside any cycle map to themselves
    let mut ids = vec![vec![Fr::ZERO; n]; 4];
    let mut sigmas = vec![vec![Fr::ZERO; n]; 4];
    for c in 0..4 {
      for r in 0..n {
        ids[c][r] = Fr::from((c * n + r) as u64);
        sigmas[c][r] = ids[c][r];
      }
    }

    // cells of each variable in row-major order; a public input's first two
    // cells are its w_l and w_r anchors
    let mut cells: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.variables.len()];
    for (r, row) in rows.iter().enumerate() {
      for (c, &v) in row.iter().enumerate() {
        cells[v].push((c, r));
      }
    }
    for cycle in &cells {
      for (t, &(c, r)) in cycle.iter().enumerate() {
        let (nc, nr) = cycle[(t + 1) % cycle.len()];
        sigmas[c][r] = Fr::from((nc * n + nr) as u64);
      }
    }
    for i in 0..m {
      let r = PUB_INPUTS_OFFSET + i;
      sigmas[0][r] = -Fr::from((r + 1) as u64);
    }

    let mut lagrange_first = vec![Fr::ZERO; n];
    lagrange_first[0] = Fr::ONE;
    let mut lagrange_last = vec![Fr::ZERO; n];
    lagrange_last[n - 1] = Fr::ONE;

    // precomputed columns in the flavor's commitment order
    let mut precomputed: Vec<MultilinearPolynomial<Fr>> = Vec::with_capacity(F::NUM_PRECOMPUTED);
    for col in selectors {
      precomputed.push(MultilinearPolynomial::new(col));
    }
    for col in sigmas {
      precomputed.push(MultilinearPolynomial::new(col));
    }
    for col in ids {
      precomputed.push(MultilinearPolynomial::new(col));
    }
    precomputed.push(MultilinearPolynomial::new(lagrange_first));
    precomputed.push(MultilinearPolynomial::new(lagrange_last));

    let mut aux = Vec::new();
    if F::NUM_AUX == 2 {
      let mut calldata = vec![Fr::ZERO; n];
      calldata[..self.calldata.len()].copy_from_slice(&self.calldata);
      let mut tags = vec![Fr::ZERO; n];
      for &i in &self.calldata_reads {
        tags[i] = Fr::ONE;
      }
      aux.push(MultilinearPolynomial::new(calldata));
      aux.push(MultilinearPolynomial::new(tags));
    }

    let commitments = precomputed
      .iter()
      .map(|p| srs.commit(p.evals()))
      .collect::<Result<Vec<_>, _>>()?;
    let vk = VerificationKey::new(
      n as u64,
      m as u64,
      PUB_INPUTS_OFFSET as u64,
      commitments,
      srs.g2_gen(),
      srs.g2_tau(),
    )?;

    let pk = ProvingKey {
      vk_digest: vk.digest()?,
      circuit_size: n as u64,
      pub_inputs_offset: PUB_INPUTS_OFFSET as u64,
      public_inputs: self.public_inputs.iter().map(|&v| self.variables[v]).collect(),
      precomputed,
      wires: wires.into_iter().map(MultilinearPolynomial::new).collect(),
      aux,
      _flavor: PhantomData,
    };

    info!(elapsed_ms = %trace_t.elapsed().as_millis(), size = n, "trace_finalize");
    Ok((pk, vk))
  }
}

impl<F: Flavor> Default for TraceBuilder<F> {
  fn default() -> Self {
    Self::new()
  }
}
