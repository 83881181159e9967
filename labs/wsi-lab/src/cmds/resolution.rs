use crate::args::{CmdResult, SlideArgs};
use crate::report;
use clap::Args;
use utils::loader;
use wsi_berry::timing::time_all_levels;

#[derive(Args, Debug)]
pub struct Resolution {
    #[command(flatten)]
    slide: SlideArgs,
}

impl Resolution {
    pub fn run(&self) -> CmdResult {
        let slide = loader::open_slide_or_default(self.slide.slide.as_deref())?;
        let profile = time_all_levels(&slide)?;
        report::print_with(|w| report::describe_levels(&profile, w))?;
        Ok(())
    }
}
