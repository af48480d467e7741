use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  default-provider: {}", self.text_provider());
        if self.default_models.is_empty() {
            println!("  default-models: (none set)");
        } else {
            println!("  default-models:");
            let mut models: Vec<_> = self.default_models.iter().collect();
            models.sort_by_key(|(k, _)| *k);
            for (provider, model) in models {
                println!("    {provider}: {model}");
            }
        }
        println!("  image-model: {}", self.image_model());
        println!("  temperature: {}", self.temperature());
        println!("  max-tokens: {}", self.max_tokens());
        match &self.roast_style {
            Some(style) => println!("  roast-style: {style}"),
            None => println!("  roast-style: (unset)"),
        }
        match &self.meme_style {
            Some(style) => println!("  meme-style: {style}"),
            None => println!("  meme-style: (unset)"),
        }
        println!("  free-daily-limit: {}", self.free_daily_limit());
        println!(
            "  premium: {}",
            if self.is_premium() { "on" } else { "off" }
        );
        match self.data_dir() {
            Ok(dir) => println!("  data-dir: {}", path_display(dir)),
            Err(err) => println!("  data-dir: ({err})"),
        }
        println!("  history-limit: {}", self.history_limit());
    }
}
