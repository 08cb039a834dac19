//! Decodificador de frames em fluxo contínuo.
//!
//! O sensor envia frames de 32 bytes em sequência pela UART, sem escape nem
//! delimitador além dos dois bytes mágicos. As leituras da porta serial não
//! respeitam fronteiras de frame, então o [`FrameDecoder`] acumula bytes entre
//! chamadas e extrai todos os frames completos a cada [`FrameDecoder::ingest`].
//!
//! Falhas nunca interrompem a decodificação: cada problema vira um
//! [`DecodeOutcome`] para o chamador registrar, e o acumulador sempre volta a
//! um estado decodificável.

use tracing::{debug, trace};

use crate::frame::{
    CHECKSUM_OFFSET, FRAME_LEN, FRAME_LENGTH_FIELD, START_BYTE_1, START_BYTE_2, checksum,
    read_u16,
};
use crate::types::Measurement;

/// Limite do acumulador sem nenhum início de frame (≈ 6 frames).
pub const MAX_BUFFER_LEN: usize = 200;

/// Resultado de um passo de decodificação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Frame válido.
    Decoded(Measurement),
    /// Acumulador passou de [`MAX_BUFFER_LEN`] sem início de frame e foi descartado.
    BufferOverrun {
        /// Bytes descartados.
        discarded: usize,
    },
    /// Campo de tamanho diferente de 28; acumulador descartado.
    InvalidLength(u16),
    /// Checksum não confere; acumulador descartado.
    ChecksumMismatch {
        /// Valor lido do frame.
        expected: u16,
        /// Soma calculada dos bytes 0..=29.
        computed: u16,
    },
}

impl DecodeOutcome {
    /// Medição, se o frame foi decodificado.
    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            DecodeOutcome::Decoded(m) => Some(m),
            _ => None,
        }
    }

    /// `true` para os resultados de diagnóstico (bytes descartados).
    pub fn is_error(&self) -> bool {
        !matches!(self, DecodeOutcome::Decoded(_))
    }
}

impl std::fmt::Display for DecodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeOutcome::Decoded(m) => write!(
                f,
                "frame OK (PM2.5 env {} µg/m³, PM10 env {} µg/m³)",
                m.pm2_5_env, m.pm10_env
            ),
            DecodeOutcome::BufferOverrun { discarded } => {
                write!(f, "buffer estourado: {discarded} bytes sem início de frame")
            }
            DecodeOutcome::InvalidLength(len) => {
                write!(f, "tamanho de frame inválido: {len} (esperado {FRAME_LENGTH_FIELD})")
            }
            DecodeOutcome::ChecksumMismatch { expected, computed } => write!(
                f,
                "checksum inválido: frame 0x{expected:04X}, calculado 0x{computed:04X}"
            ),
        }
    }
}

/// Decodificador com acumulador próprio. Uma instância por conexão serial.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Cria um decodificador com acumulador vazio.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_BUFFER_LEN + FRAME_LEN),
        }
    }

    /// Quantidade de bytes aguardando no acumulador.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Acrescenta `chunk` ao acumulador e retorna um iterador preguiçoso com
    /// os resultados, na ordem em que os frames aparecem.
    ///
    /// O chunk pode ser vazio: a decodificação é guiada pelo acumulador, então
    /// um frame completo já armazenado ainda é extraído. Se o iterador for
    /// descartado antes do fim, os bytes restantes ficam para a próxima chamada.
    pub fn ingest<'a>(&'a mut self, chunk: &[u8]) -> Outcomes<'a> {
        self.buffer.extend_from_slice(chunk);
        Outcomes { decoder: self }
    }

    /// Executa passos até produzir um resultado ou faltar dados.
    fn next_outcome(&mut self) -> Option<DecodeOutcome> {
        loop {
            // Stream dessincronizado: nenhum candidato a início de frame
            if self.buffer.len() > MAX_BUFFER_LEN && !self.buffer.contains(&START_BYTE_1) {
                let discarded = self.buffer.len();
                self.buffer.clear();
                return Some(DecodeOutcome::BufferOverrun { discarded });
            }

            // Resync: alinha no próximo 0x42
            match self.buffer.iter().position(|&b| b == START_BYTE_1) {
                Some(0) => {}
                Some(n) => {
                    trace!("Resync: descartando {n} bytes");
                    self.buffer.drain(..n);
                }
                None => {
                    if !self.buffer.is_empty() {
                        trace!("Resync: descartando {} bytes", self.buffer.len());
                    }
                    self.buffer.clear();
                    return None;
                }
            }

            if self.buffer.len() < FRAME_LEN {
                return None;
            }

            // 0x42 isolado: descarta só esse byte
            if self.buffer[1] != START_BYTE_2 {
                self.buffer.remove(0);
                continue;
            }

            let length = read_u16(&self.buffer, 2);
            if length != FRAME_LENGTH_FIELD {
                debug!("Campo de tamanho inválido ({length}), descartando {} bytes", self.buffer.len());
                self.buffer.clear();
                return Some(DecodeOutcome::InvalidLength(length));
            }

            let expected = read_u16(&self.buffer, CHECKSUM_OFFSET);
            let computed = checksum(&self.buffer[..CHECKSUM_OFFSET]);
            if expected != computed {
                debug!("Checksum inválido, descartando {} bytes", self.buffer.len());
                self.buffer.clear();
                return Some(DecodeOutcome::ChecksumMismatch { expected, computed });
            }

            let measurement = Measurement::from_frame(&self.buffer[..FRAME_LEN]);
            self.buffer.drain(..FRAME_LEN);
            return Some(DecodeOutcome::Decoded(measurement));
        }
    }
}

/// Iterador retornado por [`FrameDecoder::ingest`].
#[derive(Debug)]
pub struct Outcomes<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Outcomes<'_> {
    type Item = DecodeOutcome;

    fn next(&mut self) -> Option<DecodeOutcome> {
        self.decoder.next_outcome()
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_frame;

    fn sample(seed: u16) -> Measurement {
        Measurement {
            pm1_0_standard: seed,
            pm2_5_standard: seed + 1,
            pm10_standard: seed + 2,
            pm1_0_env: seed + 3,
            pm2_5_env: seed + 4,
            pm10_env: seed + 5,
            particles_03um: seed + 600,
            particles_05um: seed + 500,
            particles_10um: seed + 400,
            particles_25um: seed + 30,
            particles_50um: seed + 20,
            particles_100um: seed + 10,
            reserved: 0x9700,
        }
    }

    fn decoded(outcomes: &[DecodeOutcome]) -> Vec<Measurement> {
        outcomes.iter().filter_map(|o| o.measurement().copied()).collect()
    }

    /// Stream com frames, lixo e frames corrompidos misturados.
    fn noisy_stream() -> Vec<u8> {
        let mut stream = vec![0x00, 0x13, 0x37];
        stream.extend_from_slice(&encode_frame(&sample(10)));
        stream.extend_from_slice(&[0x42, 0x00, 0x11]);
        stream.extend_from_slice(&encode_frame(&sample(20)));
        stream.extend_from_slice(&encode_frame(&sample(30)));
        stream.extend_from_slice(&[0xFF; 7]);
        stream.extend_from_slice(&encode_frame(&sample(40)));
        stream
    }

    #[test]
    fn decodes_single_frame() {
        let m = sample(5);
        let mut decoder = FrameDecoder::new();
        let out: Vec<_> = decoder.ingest(&encode_frame(&m)).collect();

        assert_eq!(out, vec![DecodeOutcome::Decoded(m)]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn flipped_payload_byte_is_checksum_mismatch() {
        for offset in 4..30 {
            let mut frame = encode_frame(&sample(100));
            frame[offset] ^= 0x01;

            let mut decoder = FrameDecoder::new();
            let out: Vec<_> = decoder.ingest(&frame).collect();

            assert_eq!(out.len(), 1, "offset {offset}");
            assert!(matches!(out[0], DecodeOutcome::ChecksumMismatch { .. }));
            assert_eq!(decoder.buffered(), 0);
        }
    }

    #[test]
    fn wrong_length_field_is_rejected_even_with_valid_checksum() {
        let mut frame = encode_frame(&sample(1));
        frame[3] = 0x1D;
        let sum = checksum(&frame[..30]);
        frame[30..].copy_from_slice(&sum.to_be_bytes());

        let mut decoder = FrameDecoder::new();
        let out: Vec<_> = decoder.ingest(&frame).collect();

        assert_eq!(out, vec![DecodeOutcome::InvalidLength(29)]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn leading_garbage_is_skipped_silently() {
        let m = sample(3);
        let mut stream = vec![0x00, 0x4D, 0x99, 0xFF, 0x01, 0x1C];
        stream.extend_from_slice(&encode_frame(&m));

        let mut decoder = FrameDecoder::new();
        let out: Vec<_> = decoder.ingest(&stream).collect();

        assert_eq!(out, vec![DecodeOutcome::Decoded(m)]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn desynced_stream_overruns() {
        let mut decoder = FrameDecoder::new();
        let out: Vec<_> = decoder.ingest(&[0xAA; 201]).collect();

        assert_eq!(out, vec![DecodeOutcome::BufferOverrun { discarded: 201 }]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn short_garbage_is_discarded_without_overrun() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.ingest(&[0xAA; 200]).count(), 0);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn back_to_back_frames_decode_in_order() {
        let (a, b) = (sample(1), sample(2));
        let mut stream = encode_frame(&a).to_vec();
        stream.extend_from_slice(&encode_frame(&b));

        let mut decoder = FrameDecoder::new();
        let out: Vec<_> = decoder.ingest(&stream).collect();

        assert_eq!(out, vec![DecodeOutcome::Decoded(a), DecodeOutcome::Decoded(b)]);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let m = sample(9);
        let frame = encode_frame(&m);
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.ingest(&frame[..20]).count(), 0);
        assert_eq!(decoder.buffered(), 20);

        let out: Vec<_> = decoder.ingest(&frame[20..]).collect();
        assert_eq!(out, vec![DecodeOutcome::Decoded(m)]);
    }

    #[test]
    fn empty_chunk_drains_buffered_frame() {
        let m = sample(4);
        let mut stream = encode_frame(&m).to_vec();
        stream.extend_from_slice(&encode_frame(&m));

        let mut decoder = FrameDecoder::new();
        // Consome só o primeiro resultado, o segundo frame fica no acumulador
        assert!(decoder.ingest(&stream).next().is_some());
        assert_eq!(decoder.buffered(), FRAME_LEN);

        let out: Vec<_> = decoder.ingest(&[]).collect();
        assert_eq!(out, vec![DecodeOutcome::Decoded(m)]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn false_start_byte_costs_one_byte() {
        let m = sample(7);
        let mut stream = vec![0x42, 0x42];
        stream.extend_from_slice(&encode_frame(&m));

        let mut decoder = FrameDecoder::new();
        let out: Vec<_> = decoder.ingest(&stream).collect();

        assert_eq!(out, vec![DecodeOutcome::Decoded(m)]);
    }

    #[test]
    fn trailing_bytes_kept_for_next_frame() {
        let (a, b) = (sample(11), sample(12));
        let frame_b = encode_frame(&b);
        let mut first = encode_frame(&a).to_vec();
        first.extend_from_slice(&frame_b[..10]);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoded(&decoder.ingest(&first).collect::<Vec<_>>()), vec![a]);
        assert_eq!(decoder.buffered(), 10);
        assert_eq!(decoded(&decoder.ingest(&frame_b[10..]).collect::<Vec<_>>()), vec![b]);
    }

    #[test]
    fn chunk_boundaries_do_not_change_decoded_sequence() {
        let stream = noisy_stream();

        let mut whole = FrameDecoder::new();
        let expected = decoded(&whole.ingest(&stream).collect::<Vec<_>>());
        assert_eq!(expected, vec![sample(10), sample(20), sample(30), sample(40)]);

        for size in 1..=stream.len() {
            let mut decoder = FrameDecoder::new();
            let mut out = Vec::new();
            for chunk in stream.chunks(size) {
                out.extend(decoder.ingest(chunk));
            }
            assert_eq!(decoded(&out), expected, "chunks de {size} bytes");
        }
    }

    #[test]
    fn corrupt_frame_takes_following_bytes_of_same_read() {
        let mut bad = encode_frame(&sample(1));
        bad[10] ^= 0xFF;
        let good = sample(2);
        let mut stream = bad.to_vec();
        stream.extend_from_slice(&encode_frame(&good));

        // Mesma leitura: o descarte total leva o frame seguinte junto
        let mut together = FrameDecoder::new();
        let out: Vec<_> = together.ingest(&stream).collect();
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], DecodeOutcome::ChecksumMismatch { .. }));
        assert_eq!(together.buffered(), 0);

        // Leituras separadas: o frame seguinte sobrevive
        let mut split = FrameDecoder::new();
        let mut out: Vec<_> = split.ingest(&stream[..FRAME_LEN]).collect();
        out.extend(split.ingest(&stream[FRAME_LEN..]));
        assert_eq!(decoded(&out), vec![good]);
    }

    #[test]
    fn recovers_after_checksum_mismatch() {
        let mut bad = encode_frame(&sample(1));
        bad[10] ^= 0xFF;
        let good = sample(2);

        let mut decoder = FrameDecoder::new();
        let first: Vec<_> = decoder.ingest(&bad).collect();
        assert!(first[0].is_error());

        let out: Vec<_> = decoder.ingest(&encode_frame(&good)).collect();
        assert_eq!(out, vec![DecodeOutcome::Decoded(good)]);
    }
}
