use rayon::prelude::*;

use super::stream_buffer;
use crate::{
    device::{DeviceError, HandOutput, TrackedHand},
    types::{Hand, Joint, JointKind, PixelFormat, SegmentationMask},
};

/// Hands and merged segmentation for one frame.
#[derive(Clone, Debug, Default)]
pub struct HandFrame {
    pub mask: Option<SegmentationMask>,
    pub hands: Vec<Hand>,
}

/// Refreshes the hand module and collects per-hand joints and masks.
#[derive(Debug, Default)]
pub struct HandExtractor;

impl HandExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&mut self, output: &mut dyn HandOutput) -> Result<HandFrame, DeviceError> {
        output.update()?;

        let mut frame = HandFrame::default();
        for index in 0..output.hand_count() {
            let hand = match output.hand_by_time(index) {
                Ok(hand) => hand,
                Err(err) => {
                    log::debug!("skipping hand {index}: {err}");
                    continue;
                }
            };

            match read_segmentation(hand) {
                Ok(mask) => merge_mask(&mut frame.mask, mask),
                Err(err) => log::debug!("no segmentation for hand {index}: {err}"),
            }

            frame.hands.push(Hand {
                index,
                joints: read_joints(hand),
            });
        }

        Ok(frame)
    }
}

fn read_segmentation(hand: &mut dyn TrackedHand) -> Result<SegmentationMask, DeviceError> {
    let image = hand.segmentation_image()?;
    let buffer = stream_buffer::copy_out(image, PixelFormat::Y8)?;
    Ok(SegmentationMask {
        width: buffer.width,
        height: buffer.height,
        stride: buffer.stride,
        bytes: buffer.bytes,
    })
}

/// One slot per joint type, in enumeration order, whether or not the query succeeded.
fn read_joints(hand: &dyn TrackedHand) -> Vec<Joint> {
    JointKind::ALL
        .iter()
        .map(|&kind| match hand.tracked_joint(kind) {
            Ok(data) => Joint::tracked(kind, data),
            Err(err) => {
                log::trace!("joint {kind:?} unavailable: {err}");
                Joint::untracked(kind)
            }
        })
        .collect()
}

/// First mask initialises the merge; later ones are OR-ed in byte-wise.
pub fn merge_mask(merged: &mut Option<SegmentationMask>, mask: SegmentationMask) {
    match merged {
        None => *merged = Some(mask),
        Some(existing) => {
            if existing.bytes.len() != mask.bytes.len() || existing.stride != mask.stride {
                log::warn!(
                    "segmentation size mismatch: {}x{} vs {}x{}, skipping",
                    existing.width,
                    existing.height,
                    mask.width,
                    mask.height
                );
                return;
            }
            existing
                .bytes
                .par_iter_mut()
                .zip(mask.bytes.par_iter())
                .for_each(|(dst, src)| *dst |= *src);
        }
    }
}
