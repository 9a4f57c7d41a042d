use crate::core::settings::TextLineTestSettings;
use crate::core::video::SampleGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowPulses {
    pub image_pulses: u32,
    pub longest_image: u32,
    pub longest_black: u32,
}

pub fn row_pulses(grid: &SampleGrid, row: u32, limit: u16) -> RowPulses {
    let mut pulses = RowPulses::default();
    let mut run = 0u32;
    let mut run_is_image: Option<bool> = None;

    let close = |pulses: &mut RowPulses, is_image: bool, run: u32| {
        if is_image {
            pulses.image_pulses += 1;
            pulses.longest_image = pulses.longest_image.max(run);
        } else {
            pulses.longest_black = pulses.longest_black.max(run);
        }
    };

    for x in 0..grid.width {
        let is_image = !grid.is_black(x, row, limit);
        match run_is_image {
            Some(current) if current == is_image => run += 1,
            Some(current) => {
                close(&mut pulses, current, run);
                run_is_image = Some(is_image);
                run = 1;
            }
            None => {
                run_is_image = Some(is_image);
                run = 1;
            }
        }
    }
    if let Some(current) = run_is_image {
        close(&mut pulses, current, run);
    }

    pulses
}

/// Many short bright pulses on a mostly dark row look like subtitles.
pub fn is_text_row(grid: &SampleGrid, row: u32, limit: u16, settings: &TextLineTestSettings) -> bool {
    let pulses = row_pulses(grid, row, limit);
    let width = grid.width as f64;

    if pulses.longest_image as f64 > settings.non_text_pulse * width {
        return false;
    }

    let needed = if pulses.longest_black as f64 > width / 2.0 {
        settings.pulses_to_confirm_if_half_black
    } else {
        settings.pulses_to_confirm
    };
    pulses.image_pulses > needed
}
