quantity!(Volts, "V", 1);
